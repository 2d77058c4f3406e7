use chrono::NaiveDateTime;
use diesel::prelude::*;

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::sensor_data)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SensorEntry {
    pub date_time: NaiveDateTime,
    pub sensor: String,
    pub metric: String,
    pub reading: f64,
}
