pub mod handler;
pub mod router;
pub mod msg_update_handler;
pub mod msg_cursor_handler;
pub mod msg_presence_handler;
