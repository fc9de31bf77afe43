// handlers/protected/items/mod.rs - Item catalogue under /items

pub mod image;
pub mod input;
pub mod list;
pub mod record;

pub use image::get as image_get;
pub use list::get as list_get;
pub use list::scan as scan_get;
pub use record::delete as record_delete;
pub use record::get as record_get;
pub use record::post as record_post;
pub use record::put as record_put;

use serde_json::Value;
use uuid::Uuid;

use crate::database::models::ItemListing;

/// Path the item's image is served from
pub fn item_image_url(item_id: Uuid) -> String {
    format!("/items/{}/image", item_id)
}

/// Listing JSON with its `image_url`
pub fn listing_json(listing: &ItemListing) -> Value {
    let mut value = serde_json::to_value(listing).unwrap_or(Value::Null);
    if let Value::Object(map) = &mut value {
        map.insert("image_url".to_string(), Value::String(item_image_url(listing.item_id)));
    }
    value
}
