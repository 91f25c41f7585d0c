pub mod decoders;
pub mod extract;
pub mod imap_client;
