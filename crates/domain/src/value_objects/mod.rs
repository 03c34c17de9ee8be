//! Value objects for the belegbot domain

mod amount;
mod email_address;
mod otp_code;
mod phone_number;
mod receipt_id;
mod user_id;

pub use amount::Amount;
pub use email_address::EmailAddress;
pub use otp_code::OtpCode;
pub use phone_number::PhoneNumber;
pub use receipt_id::ReceiptId;
pub use user_id::UserId;
