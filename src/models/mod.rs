mod contact;
mod item;

pub use contact::ContactPayload;
pub use item::UnlockableItem;
