//! Calendar reads.

use tracing::info;

use crate::client::{DataSource, ScopedClient};
use crate::models::Calendar;
use crate::params::CalendarQuery;
use crate::query::{Relation, Select};
use crate::Result;

/// The calendar of a world with its months, and its events projected for the
/// front-end (`start_date`/`end_date` exposed as `startDate`/`endDate`).
pub fn calendar_select(world_id: i64) -> Select {
    Select::from("world_calendars")
        .column("id")
        .relation(Relation::many("months", "calendar_months", "calendar_id").all_columns())
        .relation(
            Relation::many("events", "calendar_events", "calendar_id")
                .column("id")
                .column("title")
                .column("description")
                .column("hidden")
                .column_as("startDate", "start_date")
                .column_as("endDate", "end_date")
                .column("wiki")
                .relation(
                    Relation::one("category", "calendar_events_category", "category_id")
                        .all_columns(),
                ),
        )
        .eq("world_id", world_id)
        .limit(1)
}

/// Load the one calendar belonging to the queried world.
pub async fn fetch_calendar<D>(client: &ScopedClient<'_, D>, query: &CalendarQuery) -> Result<Calendar>
where
    D: DataSource + ?Sized,
{
    let calendar: Calendar = client.single(&calendar_select(query.world_id)).await?;

    info!(
        world_id = query.world_id,
        role = client.session().role(),
        calendar_id = calendar.id,
        months = calendar.months.len(),
        events = calendar.events.len(),
        "loaded calendar"
    );

    Ok(calendar)
}
