#[derive(Debug)]
pub struct Time(time::OffsetDateTime);

pub(crate) const TIME_FORMAT : &'static [time::format_description::FormatItem<
    'static,
>] = time::macros::format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second]"
);

impl From<time::OffsetDateTime> for Time {
    fn from(t : time::OffsetDateTime) -> Self {
        Time(t)
    }
}

impl std::ops::Deref for Time {
    type Target = time::OffsetDateTime;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
