/// Generates a BACnet enumeration with named values, a vendor-custom range and
/// a reserved remainder.
///
/// Every named variant carries its numeric code and the hyphenated name the
/// standard uses for it (`"analog-input"`, `"present-value"`,
/// `"degrees-celsius"`). Codes that are not named decode into `Custom` when
/// they fall inside `$custom_range` and into `Reserved` otherwise, so decoding a
/// number never fails.
///
/// # Example
///
/// ```rust
/// use bacnet_sim::bacnet_enum;
///
/// bacnet_enum! {
///     Fruit {
///         Apple = 1 => "apple",
///         Pear = 2 => "pear",
///     },
///     u16,
///     100..=200
/// }
///
/// assert_eq!(u16::from(Fruit::Pear), 2);
/// assert_eq!(Fruit::from(1u16), Fruit::Apple);
/// assert_eq!(Fruit::from_label("pear"), Some(Fruit::Pear));
/// assert_eq!(Fruit::Apple.to_string(), "apple");
/// assert!(matches!(Fruit::from(150u16), Fruit::Custom(v) if v.value() == 150));
/// assert!(matches!(Fruit::from(300u16), Fruit::Reserved(v) if v.value() == 300));
/// ```
///
/// Generated items:
///
/// * the enum (`Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`) and a
///   `<Name>Value` wrapper for unnamed codes
/// * `Display` using the hyphenated name, `custom-<n>` or `reserved-<n>`
/// * `From<Name> for $unit` and `From<$unit> for Name`
/// * `label()` and `from_label()` for the named variants
#[macro_export]
macro_rules! bacnet_enum {
    ($(#[$doc:meta])* $name:ident { $($variant:ident = $value:literal => $label:literal,)+ }, $unit:ident, $custom_range:expr) => {
        pastey::paste! {
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub enum $name {
                $($variant,)*
                Custom( [<$name Value>] ),
                Reserved( [<$name Value>] ),
            }

            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct [<$name Value>] { value: $unit }

            impl [<$name Value>] {
                fn new(value: $unit) -> Self {
                    Self { value }
                }

                pub fn value(&self) -> $unit {
                    self.value
                }
            }

            impl $name {
                /// Hyphenated standard name, `None` for custom and reserved codes
                pub fn label(&self) -> Option<&'static str> {
                    match self {
                        $($name::$variant => Some($label),)*
                        $name::Custom(_) | $name::Reserved(_) => None,
                    }
                }

                /// Look up a named variant by its hyphenated standard name
                pub fn from_label(label: &str) -> Option<Self> {
                    match label {
                        $($label => Some($name::$variant),)*
                        _ => None,
                    }
                }
            }

            impl std::fmt::Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    match self {
                        $($name::$variant => f.write_str($label),)*
                        $name::Custom( value ) => write!(f, "custom-{}", value.value()),
                        $name::Reserved( value ) => write!(f, "reserved-{}", value.value()),
                    }
                }
            }

            impl From<$name> for $unit {
                fn from(value: $name) -> Self {
                    match value {
                        $($name::$variant => $value,)*
                        $name::Custom( value ) => value.value(),
                        $name::Reserved( value ) => value.value(),
                    }
                }
            }

            impl From<$unit> for $name {
                fn from(value: $unit) -> Self {
                    match value {
                        $($value => $name::$variant,)*
                        v if ($custom_range).contains(&v) => {
                            $name::Custom( [<$name Value>]::new(v) )
                        }
                        v => $name::Reserved( [<$name Value>]::new(v) ),
                    }
                }
            }
        }
    };
}
