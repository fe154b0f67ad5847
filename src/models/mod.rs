pub mod activity;
pub mod inventory;
pub mod invitation;
pub mod user;

pub use activity::{ActivityLog, NewActivity};
pub use inventory::{ConsumeOutcome, InventoryItem, StockLevel};
pub use invitation::{Invitation, InvitationSummary, NewInvitation};
pub use user::{NewProfile, Session, UserProfile};
