mod cap;
mod category;
mod entry;
mod settings;

pub use cap::{MonthlyCap, MonthlyCapChange};
pub use category::Category;
pub use entry::{Entry, EntryType, PaymentMethod};
pub use settings::ReportSettings;
