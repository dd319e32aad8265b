mod build;
mod configure;
mod deploy;
mod destroy;
mod inventory;
mod list;

pub use build::build;
pub use configure::configure;
pub use deploy::deploy;
pub use destroy::destroy;
pub use inventory::inventory;
pub use list::list;
