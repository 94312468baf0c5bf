pub mod answer;
pub mod choice;
pub mod exam;
pub mod question;
pub mod session;
