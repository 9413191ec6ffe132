//! User actions: opaque handles, the open-action table, and the finished
//! trees handed to the transmission buffer.

mod api;
pub(crate) mod constants;
pub(crate) mod tree;

#[doc(inline)]
pub use api::{end_visit, enter_action, report_error, report_exception, ActionHandle};
#[doc(inline)]
pub use constants::{MAX_NAME_LENGTH, MAX_STRING_VALUE_LENGTH};
#[doc(inline)]
pub use tree::{Attachment, AttachmentValue, ClosedAction};
