use grammers_client::{Client, SignInError};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};

use readkeeper_core::{errors::Error, Result};

async fn prompt(question: &str) -> Result<String> {
    let mut out = io::stdout();
    out.write_all(question.as_bytes()).await?;
    out.flush().await?;

    let mut line = String::new();
    BufReader::new(io::stdin()).read_line(&mut line).await?;
    let answer = line.trim().to_string();
    if answer.is_empty() {
        return Err(Error::Config(format!("no answer given to {:?}", question.trim())));
    }
    Ok(answer)
}

/// Sign the account in from the terminal unless the session already is.
///
/// Returns `true` when a new login happened and the session must be saved.
pub async fn ensure_authorized(client: &Client) -> Result<bool> {
    let authorized = client
        .is_authorized()
        .await
        .map_err(|e| Error::External(format!("authorization check failed: {e}")))?;
    if authorized {
        return Ok(false);
    }

    tracing::info!("user session not authorized; starting interactive login");
    let phone = prompt("Phone number (international format): ").await?;
    let token = client
        .request_login_code(&phone)
        .await
        .map_err(|e| Error::External(format!("login code request failed: {e}")))?;
    let code = prompt("Login code: ").await?;

    let user = match client.sign_in(&token, &code).await {
        Ok(user) => user,
        Err(SignInError::PasswordRequired(password_token)) => {
            let hint = password_token.hint().unwrap_or("none").to_string();
            let password = prompt(&format!("Two-step password (hint: {hint}): ")).await?;
            client
                .check_password(password_token, password.trim())
                .await
                .map_err(|e| Error::External(format!("password rejected: {e}")))?
        }
        Err(e) => return Err(Error::External(format!("sign-in failed: {e}"))),
    };

    tracing::info!(user_id = user.id(), "user account signed in");
    Ok(true)
}
