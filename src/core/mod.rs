pub mod serialization;
pub mod session;

pub use serialization::{
    load_state_from_json, load_state_from_path, save_state_to_json, save_state_to_path,
    SessionSnapshot,
};
pub use session::Session;
