//! Fixed column layout of the monthly on-time performance file
//!
//! Columns are positional: the load skips the header row and maps fields by
//! order, so this list must match the file exactly. Every column except the
//! partition column is loaded as text; typing happens downstream of the raw
//! table. The partition column has to be a date for the warehouse to accept
//! month partitioning on it.

use serde::{Deserialize, Serialize};

/// Column the monthly partitions are keyed on
pub const PARTITION_COLUMN: &str = "FlightDate";

/// Warehouse type the non-partition columns are loaded as
pub const TEXT_TYPE: &str = "STRING";

/// Warehouse type of [`PARTITION_COLUMN`]
pub const DATE_TYPE: &str = "DATE";

pub const FLIGHT_COLUMNS: [&str; 109] = [
    "Year",
    "Quarter",
    "Month",
    "DayofMonth",
    "DayOfWeek",
    "FlightDate",
    "Reporting_Airline",
    "DOT_ID_Reporting_Airline",
    "IATA_CODE_Reporting_Airline",
    "Tail_Number",
    "Flight_Number_Reporting_Airline",
    "OriginAirportID",
    "OriginAirportSeqID",
    "OriginCityMarketID",
    "Origin",
    "OriginCityName",
    "OriginState",
    "OriginStateFips",
    "OriginStateName",
    "OriginWac",
    "DestAirportID",
    "DestAirportSeqID",
    "DestCityMarketID",
    "Dest",
    "DestCityName",
    "DestState",
    "DestStateFips",
    "DestStateName",
    "DestWac",
    "CRSDepTime",
    "DepTime",
    "DepDelay",
    "DepDelayMinutes",
    "DepDel15",
    "DepartureDelayGroups",
    "DepTimeBlk",
    "TaxiOut",
    "WheelsOff",
    "WheelsOn",
    "TaxiIn",
    "CRSArrTime",
    "ArrTime",
    "ArrDelay",
    "ArrDelayMinutes",
    "ArrDel15",
    "ArrivalDelayGroups",
    "ArrTimeBlk",
    "Cancelled",
    "CancellationCode",
    "Diverted",
    "CRSElapsedTime",
    "ActualElapsedTime",
    "AirTime",
    "Flights",
    "Distance",
    "DistanceGroup",
    "CarrierDelay",
    "WeatherDelay",
    "NASDelay",
    "SecurityDelay",
    "LateAircraftDelay",
    "FirstDepTime",
    "TotalAddGTime",
    "LongestAddGTime",
    "DivAirportLandings",
    "DivReachedDest",
    "DivActualElapsedTime",
    "DivArrDelay",
    "DivDistance",
    "Div1Airport",
    "Div1AirportID",
    "Div1AirportSeqID",
    "Div1WheelsOn",
    "Div1TotalGTime",
    "Div1LongestGTime",
    "Div1WheelsOff",
    "Div1TailNum",
    "Div2Airport",
    "Div2AirportID",
    "Div2AirportSeqID",
    "Div2WheelsOn",
    "Div2TotalGTime",
    "Div2LongestGTime",
    "Div2WheelsOff",
    "Div2TailNum",
    "Div3Airport",
    "Div3AirportID",
    "Div3AirportSeqID",
    "Div3WheelsOn",
    "Div3TotalGTime",
    "Div3LongestGTime",
    "Div3WheelsOff",
    "Div3TailNum",
    "Div4Airport",
    "Div4AirportID",
    "Div4AirportSeqID",
    "Div4WheelsOn",
    "Div4TotalGTime",
    "Div4LongestGTime",
    "Div4WheelsOff",
    "Div4TailNum",
    "Div5Airport",
    "Div5AirportID",
    "Div5AirportSeqID",
    "Div5WheelsOn",
    "Div5TotalGTime",
    "Div5LongestGTime",
    "Div5WheelsOff",
    "Div5TailNum",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
}

/// The full schema, in file order: `FlightDate` as a date, the rest as text
pub fn flight_schema() -> Vec<SchemaField> {
    FLIGHT_COLUMNS
        .iter()
        .map(|name| {
            let field_type = if *name == PARTITION_COLUMN { DATE_TYPE } else { TEXT_TYPE };
            SchemaField {
                name: (*name).to_string(),
                field_type: field_type.to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_schema_text_except_partition_date() {
        let schema = flight_schema();
        assert_eq!(schema.len(), 109);

        let dates: Vec<_> = schema.iter().filter(|f| f.field_type == DATE_TYPE).collect();
        assert_eq!(dates.len(), 1);
        assert_eq!(dates[0].name, PARTITION_COLUMN);
        assert!(schema
            .iter()
            .filter(|f| f.name != PARTITION_COLUMN)
            .all(|f| f.field_type == TEXT_TYPE));

        let names: HashSet<_> = schema.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names.len(), schema.len());
    }

    #[test]
    fn test_layout_landmarks() {
        assert_eq!(FLIGHT_COLUMNS[0], "Year");
        assert_eq!(FLIGHT_COLUMNS[5], PARTITION_COLUMN);
        assert_eq!(FLIGHT_COLUMNS[108], "Div5TailNum");
    }
}
