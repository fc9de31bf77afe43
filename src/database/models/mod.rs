pub mod invitation;
pub mod item;
pub mod organization;
pub mod profile;
pub mod request;
pub mod role;
pub mod scan;
pub mod user;

pub use invitation::Invitation;
pub use item::{Item, ItemListing, Vendor};
pub use organization::Organization;
pub use profile::{NotificationPreferences, ProfileInfo};
pub use request::{BorrowRequest, UserScan};
pub use role::{Permission, Role};
pub use scan::{ItemReturn, ScanHistory};
pub use user::{User, UserListing};
