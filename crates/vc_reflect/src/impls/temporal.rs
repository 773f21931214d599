use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};

crate::impls::impl_reflect_opaque!(NaiveDate => "chrono::NaiveDate");
crate::impls::impl_reflect_opaque!(NaiveTime => "chrono::NaiveTime");
crate::impls::impl_reflect_opaque!(NaiveDateTime => "chrono::NaiveDateTime");
crate::impls::impl_reflect_opaque!(DateTime<Utc> => "chrono::DateTime<chrono::Utc>");
crate::impls::impl_reflect_opaque!(DateTime<FixedOffset> => "chrono::DateTime<chrono::FixedOffset>");
