use crate::domain::UserId;

/// Only the controlling user may drive the menu.
pub fn is_authorized(user_id: Option<UserId>, owner: UserId) -> bool {
    user_id == Some(owner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_owner_is_authorized() {
        let owner = UserId(777);
        assert!(is_authorized(Some(UserId(777)), owner));
        assert!(!is_authorized(Some(UserId(778)), owner));
        assert!(!is_authorized(None, owner));
    }
}
