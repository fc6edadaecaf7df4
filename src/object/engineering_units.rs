use crate::bacnet_enum;

bacnet_enum! {
    /// Engineering units offered for analog inputs (BACnetEngineeringUnits)
    EngineeringUnits {
        Milliamperes = 2 => "milliamperes",
        Amperes = 3 => "amperes",
        Volts = 5 => "volts",
        Lumens = 36 => "lumens",
        Luxes = 37 => "luxes",
        Watts = 47 => "watts",
        Kilowatts = 48 => "kilowatts",
        Megawatts = 49 => "megawatts",
        Pascals = 53 => "pascals",
        Kilopascals = 54 => "kilopascals",
        Bars = 55 => "bars",
        DegreesCelsius = 62 => "degrees-celsius",
        DegreesKelvin = 63 => "degrees-kelvin",
        DegreesFahrenheit = 64 => "degrees-fahrenheit",
        NoUnits = 95 => "no-units",
        PartsPerMillion = 96 => "parts-per-million",
        PartsPerBillion = 97 => "parts-per-billion",
        Percent = 98 => "percent",
        Millivolts = 124 => "millivolts",
        Millibars = 134 => "millibars",
    },
    u32,
    256..=65535
}

impl EngineeringUnits {
    /// Map a unit name as stored on a point to its enumeration, unknown names
    /// become `NoUnits`
    pub fn from_name(name: &str) -> Self {
        Self::from_label(name).unwrap_or(Self::NoUnits)
    }
}
