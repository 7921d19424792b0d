pub mod daily_series;
pub mod provider;
pub mod variable;
