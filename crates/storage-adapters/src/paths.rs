//! Document paths of the hosted store the mobile client used.
//! Both adapters log with these so records can be matched to existing data.

use domains::{ChatId, DesignId, Region, UserId};

pub const DESIGNS: &str = "designs";
pub const USERS: &str = "users";
pub const REGIONS: &str = "regions";
pub const CHATS: &str = "chats";
pub const MESSAGES: &str = "messages";

pub fn design(id: &DesignId) -> String {
    format!("{DESIGNS}/{id}")
}

pub fn region_design(region: &Region, id: &DesignId) -> String {
    format!("{REGIONS}/{region}/{DESIGNS}/{id}")
}

pub fn user(id: &UserId) -> String {
    format!("{USERS}/{id}")
}

pub fn chat_messages(id: &ChatId) -> String {
    format!("{CHATS}/{id}/{MESSAGES}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_copy_path_matches_hosted_schema() {
        let path = region_design(&Region::parse("Europe").unwrap(), &DesignId::new("X"));
        assert_eq!(path, "regions/Europe/designs/X");
        assert_eq!(chat_messages(&ChatId::new("c1")), "chats/c1/messages");
    }
}
