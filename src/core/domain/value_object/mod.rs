pub mod backend_url;
pub mod base_value_object;
pub mod vm_name;

pub use backend_url::BackendUrl;
pub use base_value_object::ValueObject;
pub use vm_name::VmName;
