pub mod chats;
pub mod designs;
pub mod feed;
pub mod health;
pub mod users;
