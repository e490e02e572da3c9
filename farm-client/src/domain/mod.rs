pub mod control;
pub mod reading;
pub mod sensor;

pub use control::{
    ControlCategory, ControlInfo, ControlList, Health, HistoryResponse, RawRead, RawWrite,
    ReadResponse, SettingValue, WriteResponse,
};
pub use reading::{numeric_value, parse_timestamp, RawReading, Reading};
pub use sensor::{SensorEntry, SensorSnapshot, SensorsEnvelope};
