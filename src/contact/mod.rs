pub mod notifier;
pub mod submission;
pub mod submitter;
pub mod validation;

pub use notifier::{DeliveryError, Notifier, OutboxNotifier};
pub use submission::{ContactError, ContactStage, ContactSubmission};
pub use submitter::{ContactRequestSubmitter, SubmitOutcome};
pub use validation::{classify_contact, is_valid_contact, ContactKind};
