diesel::table! {
    #[sql_name = "SensorData"]
    sensor_data (date_time, sensor, metric) {
        #[sql_name = "DateTime"]
        date_time -> Timestamp,
        #[sql_name = "Sensor"]
        sensor -> Text,
        #[sql_name = "Metric"]
        metric -> Text,
        #[sql_name = "Reading"]
        reading -> Double,
    }
}
