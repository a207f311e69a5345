//! Pathweaver: adapters for the external media renderer and the store its
//! output lands in.

pub mod fs_inventory;
pub mod http_renderer;

pub use fs_inventory::FsAssetInventory;
pub use http_renderer::HttpAssetRenderer;
