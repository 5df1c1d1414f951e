pub mod cred;
pub mod export;
pub mod forget;
pub mod info;
pub mod lock;
pub mod select;
pub mod show;
pub mod status;
