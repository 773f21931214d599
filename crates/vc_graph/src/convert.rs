use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, SecondsFormat, Utc};
use vc_reflect::info::TypeInfo;
use vc_reflect::ops::ReflectRef;
use vc_reflect::{Reflect, ReflectBox};

use crate::config::EngineConfig;
use crate::error::{ErrorKind, GraphError, Result};
use crate::model::Primitive;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";
const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

fn unsupported(value: &Primitive, target: &'static TypeInfo) -> GraphError {
    ErrorKind::unsupported(value, target.type_path()).into()
}

// -----------------------------------------------------------------------------
// Scalar coercions

fn integer(value: &Primitive) -> Option<i128> {
    match value {
        Primitive::Null => Some(0),
        Primitive::Bool(value) => Some(i128::from(*value)),
        Primitive::Int(value) => Some(i128::from(*value)),
        Primitive::UInt(value) => Some(i128::from(*value)),
        Primitive::Float(value) if value.is_finite() => Some(*value as i128),
        Primitive::Float(_) => None,
        Primitive::Str(text) => {
            let text = text.trim();
            text.parse::<i128>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i128))
        }
    }
}

fn unsigned(value: &Primitive) -> Option<u128> {
    match value {
        Primitive::UInt(value) => Some(u128::from(*value)),
        Primitive::Str(text) => text
            .trim()
            .parse::<u128>()
            .ok()
            .or_else(|| integer(value).map(|number| number as u128)),
        _ => integer(value).map(|number| number as u128),
    }
}

fn float(value: &Primitive) -> Option<f64> {
    match value {
        Primitive::Null => Some(0.0),
        Primitive::Bool(value) => Some(f64::from(u8::from(*value))),
        Primitive::Int(value) => Some(*value as f64),
        Primitive::UInt(value) => Some(*value as f64),
        Primitive::Float(value) => Some(*value),
        Primitive::Str(text) => text.trim().parse::<f64>().ok(),
    }
}

fn boolean(value: &Primitive) -> Option<bool> {
    match value {
        Primitive::Null => Some(false),
        Primitive::Bool(value) => Some(*value),
        Primitive::Int(value) => Some(*value != 0),
        Primitive::UInt(value) => Some(*value != 0),
        Primitive::Float(value) => Some(*value != 0.0),
        Primitive::Str(text) => match text.trim() {
            text if text.eq_ignore_ascii_case("true") => Some(true),
            text if text.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        },
    }
}

fn character(value: &Primitive) -> Option<char> {
    match value {
        Primitive::Null => Some('\0'),
        Primitive::Str(text) => {
            let mut chars = text.chars();
            let first = chars.next()?;
            chars.next().is_none().then_some(first)
        }
        Primitive::Int(_) | Primitive::UInt(_) => {
            u32::try_from(integer(value)?).ok().and_then(char::from_u32)
        }
        Primitive::Bool(_) | Primitive::Float(_) => None,
    }
}

fn text(value: &Primitive) -> String {
    match value {
        Primitive::Null => String::new(),
        Primitive::Str(text) => text.clone(),
        other => other.to_string(),
    }
}

macro_rules! convert_numbers {
    ($value:ident, $target:ident, $extract:ident; $($ty:ty),* $(,)?) => {
        $(
            if $target.is::<$ty>() {
                let number = $extract($value).ok_or_else(|| unsupported($value, $target))?;
                return Ok(Box::new(number as $ty));
            }
        )*
    };
}

macro_rules! to_primitive {
    ($value:ident; $($ty:ty => |$bound:ident| $primitive:expr),* $(,)?) => {
        $(
            if let Some($bound) = $value.downcast_ref::<$ty>() {
                return Ok($primitive);
            }
        )*
    };
}

// -----------------------------------------------------------------------------
// Converter

/// Converts between document scalars and reflected leaf values.
///
/// Numbers convert into every numeric type with `as` semantics, so floats
/// truncate toward zero and narrowing wraps. Null becomes the default of a
/// primitive. Strings parse into numbers, booleans, enum constants and
/// `chrono` dates and times.
///
/// ```
/// use vc_graph::{Converter, EngineConfig, Primitive};
/// use vc_reflect::info::Typed;
///
/// let converter = Converter::new(&EngineConfig::default());
///
/// let value = converter.convert(&Primitive::Float(3.9), u8::type_info()).unwrap();
/// assert_eq!(value.downcast_ref::<u8>(), Some(&3));
///
/// let value = converter.convert(&Primitive::Str("-12".into()), i64::type_info()).unwrap();
/// assert_eq!(value.downcast_ref::<i64>(), Some(&-12));
/// ```
#[derive(Clone, Debug)]
pub struct Converter {
    temporal_patterns: Vec<String>,
    default_offset: FixedOffset,
}

impl Converter {
    pub fn new(config: &EngineConfig) -> Self {
        let default_offset = FixedOffset::east_opt(config.default_offset_seconds).unwrap_or_else(|| {
            log::warn!(
                "default offset of {} seconds is out of range, using UTC",
                config.default_offset_seconds
            );
            Utc.fix()
        });
        Self {
            temporal_patterns: config.temporal_patterns.clone(),
            default_offset,
        }
    }

    #[inline]
    pub fn default_offset(&self) -> FixedOffset {
        self.default_offset
    }

    /// Builds a value of `target` from a document scalar.
    ///
    /// `Option<T>` maps null to `None` and anything else through `T`. A
    /// polymorphic slot receives the natural type of the scalar: `bool`,
    /// `i64`, `u64`, `f64`, `String`, or `()` for null.
    pub fn convert(&self, value: &Primitive, target: &'static TypeInfo) -> Result<Box<dyn Reflect>> {
        match target {
            TypeInfo::Optional(info) => {
                if value.is_null() {
                    return Ok(info.none());
                }
                let inner = self.convert(value, info.some_info())?;
                info.some(inner)
                    .map_err(|_| unsupported(value, target))
            }
            TypeInfo::Shared(info) => {
                if value.is_null() {
                    return Err(unsupported(value, target));
                }
                let inner = self.convert(value, info.inner_info())?;
                info.wrap(inner).map_err(|_| unsupported(value, target))
            }
            TypeInfo::Dyn(_) => Ok(natural(value)),
            TypeInfo::Enum(info) => {
                let Primitive::Str(name) = value else {
                    return Err(unsupported(value, target));
                };
                let Some(variant) = info.variant(name) else {
                    return Err(ErrorKind::UnknownEnumConstant {
                        enum_path: info.type_path(),
                        name: name.clone(),
                    }
                    .into());
                };
                info.construct(variant.index()).ok_or_else(|| {
                    ErrorKind::MissingConstructor {
                        type_path: info.type_path(),
                    }
                    .into()
                })
            }
            TypeInfo::Opaque(_) => self.convert_leaf(value, target),
            _ => Err(unsupported(value, target)),
        }
    }

    fn convert_leaf(&self, value: &Primitive, target: &'static TypeInfo) -> Result<Box<dyn Reflect>> {
        convert_numbers!(value, target, integer; i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, usize);
        convert_numbers!(value, target, unsigned; u128);
        convert_numbers!(value, target, float; f32, f64);

        if target.is::<bool>() {
            return boolean(value)
                .map(|value| Box::new(value) as Box<dyn Reflect>)
                .ok_or_else(|| unsupported(value, target));
        }
        if target.is::<char>() {
            return character(value)
                .map(|value| Box::new(value) as Box<dyn Reflect>)
                .ok_or_else(|| unsupported(value, target));
        }
        if target.is::<String>() {
            return Ok(Box::new(text(value)));
        }
        if target.is::<()>() {
            return Ok(Box::new(()));
        }
        if let Some(temporal) = self.convert_temporal(value, target) {
            return temporal.ok_or_else(|| unsupported(value, target));
        }
        Err(unsupported(value, target))
    }

    /// The scalar form of a leaf value.
    ///
    /// `i128` and `u128` values outside the 64-bit range become decimal
    /// strings. Dates and times become ISO-8601 strings.
    pub fn to_primitive(&self, value: &dyn Reflect) -> Result<Primitive> {
        to_primitive! { value;
            () => |_v| Primitive::Null,
            bool => |v| Primitive::Bool(*v),
            char => |v| Primitive::Str(v.to_string()),
            String => |v| Primitive::Str(v.clone()),
            i8 => |v| Primitive::Int(i64::from(*v)),
            i16 => |v| Primitive::Int(i64::from(*v)),
            i32 => |v| Primitive::Int(i64::from(*v)),
            i64 => |v| Primitive::Int(*v),
            isize => |v| Primitive::Int(*v as i64),
            i128 => |v| i64::try_from(*v).map_or_else(|_| Primitive::Str(v.to_string()), Primitive::Int),
            u8 => |v| Primitive::UInt(u64::from(*v)),
            u16 => |v| Primitive::UInt(u64::from(*v)),
            u32 => |v| Primitive::UInt(u64::from(*v)),
            u64 => |v| Primitive::UInt(*v),
            usize => |v| Primitive::UInt(*v as u64),
            u128 => |v| u64::try_from(*v).map_or_else(|_| Primitive::Str(v.to_string()), Primitive::UInt),
            f32 => |v| Primitive::Float(f64::from(*v)),
            f64 => |v| Primitive::Float(*v),
            NaiveDate => |v| Primitive::Str(v.format(DATE_FORMAT).to_string()),
            NaiveTime => |v| Primitive::Str(v.format(TIME_FORMAT).to_string()),
            NaiveDateTime => |v| Primitive::Str(v.format(DATE_TIME_FORMAT).to_string()),
            DateTime<Utc> => |v| Primitive::Str(v.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            DateTime<FixedOffset> => |v| Primitive::Str(v.to_rfc3339_opts(SecondsFormat::AutoSi, false)),
        }
        match value.reflect_ref() {
            ReflectRef::Dyn(slot) => self.to_primitive(slot.get()),
            ReflectRef::Optional(optional) => match optional.value() {
                Some(inner) => self.to_primitive(inner),
                None => Ok(Primitive::Null),
            },
            ReflectRef::Enum(value) if value.field_len() == 0 => {
                Ok(Primitive::Str(String::from(value.variant_name())))
            }
            _ => Err(ErrorKind::unsupported(value.reflect_type_path(), "a scalar").into()),
        }
    }

    /// Converts a reflected leaf value to another leaf type through its
    /// scalar form.
    pub fn convert_value(&self, value: &dyn Reflect, target: &'static TypeInfo) -> Result<Box<dyn Reflect>> {
        let primitive = self.to_primitive(value)?;
        self.convert(&primitive, target)
    }

    // -------------------------------------------------------------------------
    // Dates and times

    /// `None` when `target` is not a date or time type.
    fn convert_temporal(&self, value: &Primitive, target: &'static TypeInfo) -> Option<Option<Box<dyn Reflect>>> {
        fn boxed<T: Reflect>(value: Option<T>) -> Option<Box<dyn Reflect>> {
            value.map(|value| Box::new(value) as Box<dyn Reflect>)
        }

        if target.is::<NaiveDate>() {
            Some(boxed(self.naive_date(value)))
        } else if target.is::<NaiveTime>() {
            Some(boxed(self.naive_time(value)))
        } else if target.is::<NaiveDateTime>() {
            Some(boxed(self.naive_date_time(value)))
        } else if target.is::<DateTime<FixedOffset>>() {
            Some(boxed(self.date_time(value)))
        } else if target.is::<DateTime<Utc>>() {
            Some(boxed(self.date_time(value).map(|value| value.with_timezone(&Utc))))
        } else {
            None
        }
    }

    fn patterns(&self) -> impl Iterator<Item = &str> {
        self.temporal_patterns.iter().map(String::as_str)
    }

    fn from_millis(&self, millis: i64) -> Option<DateTime<FixedOffset>> {
        DateTime::from_timestamp_millis(millis).map(|value| value.with_timezone(&self.default_offset))
    }

    fn date_time(&self, value: &Primitive) -> Option<DateTime<FixedOffset>> {
        match value {
            Primitive::Int(millis) => self.from_millis(*millis),
            Primitive::UInt(millis) => self.from_millis(i64::try_from(*millis).ok()?),
            Primitive::Str(text) => {
                let text = text.trim();
                DateTime::parse_from_rfc3339(text)
                    .ok()
                    .or_else(|| {
                        self.patterns()
                            .find_map(|pattern| DateTime::parse_from_str(text, pattern).ok())
                    })
                    .or_else(|| {
                        let naive = self.naive_date_time(value)?;
                        naive.and_local_timezone(self.default_offset).single()
                    })
            }
            _ => None,
        }
    }

    fn naive_date_time(&self, value: &Primitive) -> Option<NaiveDateTime> {
        match value {
            Primitive::Int(_) | Primitive::UInt(_) => self.date_time(value).map(|value| value.naive_local()),
            Primitive::Str(text) => {
                let text = text.trim();
                self.patterns()
                    .find_map(|pattern| NaiveDateTime::parse_from_str(text, pattern).ok())
                    .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|value| value.naive_local()))
                    .or_else(|| self.naive_date(value).and_then(|date| date.and_hms_opt(0, 0, 0)))
            }
            _ => None,
        }
    }

    fn naive_date(&self, value: &Primitive) -> Option<NaiveDate> {
        match value {
            Primitive::Int(_) | Primitive::UInt(_) => self.date_time(value).map(|value| value.date_naive()),
            Primitive::Str(text) => {
                let text = text.trim();
                self.patterns()
                    .find_map(|pattern| NaiveDate::parse_from_str(text, pattern).ok())
                    .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|value| value.date_naive()))
            }
            _ => None,
        }
    }

    fn naive_time(&self, value: &Primitive) -> Option<NaiveTime> {
        match value {
            Primitive::Str(text) => {
                let text = text.trim();
                self.patterns()
                    .find_map(|pattern| NaiveTime::parse_from_str(text, pattern).ok())
            }
            _ => None,
        }
    }
}

/// The value a scalar takes in a polymorphic slot.
fn natural(value: &Primitive) -> Box<dyn Reflect> {
    match value {
        Primitive::Null => Box::new(ReflectBox::null()),
        Primitive::Bool(value) => Box::new(*value),
        Primitive::Int(value) => Box::new(*value),
        Primitive::UInt(value) => Box::new(*value),
        Primitive::Float(value) => Box::new(*value),
        Primitive::Str(value) => Box::new(value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
    use vc_reflect::info::Typed;
    use vc_reflect::{Reflect, ReflectBox};

    use super::Converter;
    use crate::config::EngineConfig;
    use crate::error::ErrorKind;
    use crate::model::Primitive;

    #[derive(Reflect, Debug, PartialEq)]
    enum Color {
        Red,
        Green,
    }

    fn converter() -> Converter {
        Converter::new(&EngineConfig::default())
    }

    fn convert<T: Typed + Copy>(value: Primitive) -> Option<T> {
        converter()
            .convert(&value, T::type_info())
            .ok()
            .and_then(|value| value.downcast_ref::<T>().copied())
    }

    #[test]
    fn numbers_follow_cast_rules() {
        assert_eq!(convert::<i32>(Primitive::Float(-2.7)), Some(-2));
        assert_eq!(convert::<u8>(Primitive::Int(300)), Some(44));
        assert_eq!(convert::<f32>(Primitive::Int(3)), Some(3.0));
        assert_eq!(convert::<i64>(Primitive::Str(" 42 ".into())), Some(42));
        assert_eq!(convert::<u16>(Primitive::Str("7.9".into())), Some(7));
        assert_eq!(convert::<i64>(Primitive::Bool(true)), Some(1));
        assert_eq!(convert::<u32>(Primitive::Str("many".into())), None);
    }

    #[test]
    fn null_is_the_default_of_a_primitive() {
        assert_eq!(convert::<i32>(Primitive::Null), Some(0));
        assert_eq!(convert::<bool>(Primitive::Null), Some(false));
        assert_eq!(convert::<f64>(Primitive::Null), Some(0.0));

        let value = converter().convert(&Primitive::Null, Option::<i32>::type_info()).unwrap();
        assert_eq!(value.downcast_ref::<Option<i32>>(), Some(&None));

        let value = converter().convert(&Primitive::Null, ReflectBox::type_info()).unwrap();
        assert!(value.downcast_ref::<ReflectBox>().is_some_and(ReflectBox::is_null));
    }

    #[test]
    fn wide_integers_round_trip_as_strings() {
        let converter = converter();
        let big = u128::MAX - 3;
        let primitive = converter.to_primitive(&big).unwrap();
        assert_eq!(primitive, Primitive::Str(big.to_string()));
        let back = converter.convert(&primitive, u128::type_info()).unwrap();
        assert_eq!(back.downcast_ref::<u128>(), Some(&big));

        assert_eq!(converter.to_primitive(&-5_i128).unwrap(), Primitive::Int(-5));
        assert_eq!(convert::<i128>(Primitive::Str(i128::MIN.to_string())), Some(i128::MIN));
    }

    #[test]
    fn enum_constants() {
        let converter = converter();
        let value = converter.convert(&Primitive::Str("Green".into()), Color::type_info()).unwrap();
        assert_eq!(value.downcast_ref::<Color>(), Some(&Color::Green));

        let err = converter.convert(&Primitive::Str("green".into()), Color::type_info()).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnknownEnumConstant { .. }));

        assert_eq!(converter.to_primitive(&Color::Red).unwrap(), Primitive::Str("Red".into()));
    }

    #[test]
    fn scalars_in_polymorphic_slots_are_natural() {
        let converter = converter();
        let value = converter.convert(&Primitive::Int(5), ReflectBox::type_info()).unwrap();
        assert_eq!(value.downcast_ref::<i64>(), Some(&5));
        let value = converter.convert(&Primitive::Str("x".into()), ReflectBox::type_info()).unwrap();
        assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("x"));
    }

    #[test]
    fn dates_and_times() {
        let converter = Converter::new(&EngineConfig {
            default_offset_seconds: 3600,
            ..EngineConfig::default()
        });

        let date = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
        assert_eq!(convert::<NaiveDate>(Primitive::Str("2024-05-17".into())), Some(date));
        assert_eq!(convert::<NaiveDate>(Primitive::Str("2024-05-17T10:00:00".into())), Some(date));

        let time = NaiveTime::from_hms_milli_opt(10, 30, 0, 250).unwrap();
        assert_eq!(convert::<NaiveTime>(Primitive::Str("10:30:00.250".into())), Some(time));

        let local = date.and_time(time);
        assert_eq!(convert::<NaiveDateTime>(Primitive::Str("2024-05-17 10:30:00.250".into())), Some(local));

        let with_offset = converter
            .convert(&Primitive::Str("2024-05-17T10:30:00.250".into()), DateTime::<FixedOffset>::type_info())
            .unwrap();
        let with_offset = with_offset.downcast_ref::<DateTime<FixedOffset>>().copied().unwrap();
        assert_eq!(with_offset.offset().local_minus_utc(), 3600);
        assert_eq!(with_offset.naive_local(), local);

        let utc = converter
            .convert(&Primitive::Int(0), DateTime::<Utc>::type_info())
            .unwrap();
        assert_eq!(utc.downcast_ref::<DateTime<Utc>>().copied(), Some(DateTime::<Utc>::UNIX_EPOCH));

        assert_eq!(
            converter.to_primitive(&DateTime::<Utc>::UNIX_EPOCH).unwrap(),
            Primitive::Str("1970-01-01T00:00:00Z".into())
        );
        assert_eq!(converter.to_primitive(&date).unwrap(), Primitive::Str("2024-05-17".into()));

        let err = converter.convert(&Primitive::Str("soon".into()), NaiveDate::type_info()).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnsupportedConversion { .. }));
    }
}
