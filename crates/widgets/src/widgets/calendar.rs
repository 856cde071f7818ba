//! Month-grid date picker.
//!
//! ```text
//! [<] [2024] [>]
//! [<] [ May] [>]
//! [Mo][Tu][We][Th][Fr][Sa][Su]
//! [  ][  ][ 1][ 2][ 3][ 4][ 5]
//! ...
//! ```
//!
//! Arrows carry the month to show next; days carry the selected date. A round whose
//! payload holds a selected date (and is not an arrow click) resolves the widget.

use chrono::{Datelike, Days, Local, Months, NaiveDate};
use snafu::ensure;

use super::{Frame, Outcome, WidgetContext, deliver_outcome};
use crate::error::{InvalidConfigSnafu, MissingSelectionSnafu, WidgetResult};
use crate::markup::{Control, Markup};
use crate::payload::{Payload, StateCodec, format_date};
use crate::reconciler::Reconciler;
use crate::settings::CalendarStrings;
use crate::types::InteractionEvent;
use crate::validate::ensure_positive;

pub const MONTH_TO_DISPLAY_KEY: &str = "calendar_month_to_display";
pub const SELECTED_DATE_KEY: &str = "calendar_selected_date";

const DAYS_IN_WEEK: usize = 7;
const MONTHS_IN_YEAR: usize = 12;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarState {
    pub month_to_display: Option<NaiveDate>,
    pub selected_date: Option<NaiveDate>,
}

impl StateCodec for CalendarState {
    const KEYS: &'static [&'static str] = &[MONTH_TO_DISPLAY_KEY, SELECTED_DATE_KEY];

    fn decode(payload: &Payload) -> WidgetResult<Self> {
        Ok(Self {
            month_to_display: payload.date(MONTH_TO_DISPLAY_KEY, "calendar-decode-month")?,
            selected_date: payload.date(SELECTED_DATE_KEY, "calendar-decode-selected")?,
        })
    }

    fn encode(&self, payload: &mut Payload) {
        if let Some(month) = self.month_to_display {
            payload.insert(MONTH_TO_DISPLAY_KEY, format_date(month));
        }
        if let Some(selected) = self.selected_date {
            payload.insert(SELECTED_DATE_KEY, format_date(selected));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarConfig {
    /// First selectable day; defaults to today.
    pub start_date: Option<NaiveDate>,
    pub end_date: NaiveDate,
    /// Lifts the lower bound entirely.
    pub include_past: bool,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX),
            include_past: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Calendar {
    context: WidgetContext,
    strings: CalendarStrings,
    start_date: NaiveDate,
    end_date: NaiveDate,
    include_past: bool,
    today: NaiveDate,
}

impl Calendar {
    pub fn new(
        context: WidgetContext,
        config: CalendarConfig,
        strings: CalendarStrings,
    ) -> WidgetResult<Self> {
        Self::new_at(context, config, strings, Local::now().date_naive())
    }

    /// Same as [`Calendar::new`] with an explicit notion of today.
    pub fn new_at(
        context: WidgetContext,
        config: CalendarConfig,
        strings: CalendarStrings,
        today: NaiveDate,
    ) -> WidgetResult<Self> {
        let start_date = config.start_date.unwrap_or(today);

        ensure!(
            start_date <= config.end_date,
            InvalidConfigSnafu {
                stage: "calendar-new-date-range",
                details: format!(
                    "start date {start_date} is after end date {}",
                    config.end_date
                ),
            }
        );
        ensure!(
            strings.months.len() == MONTHS_IN_YEAR && strings.weekdays.len() == DAYS_IN_WEEK,
            InvalidConfigSnafu {
                stage: "calendar-new-name-tables",
                details: format!(
                    "expected 12 month and 7 weekday names, got {} and {}",
                    strings.months.len(),
                    strings.weekdays.len()
                ),
            }
        );
        ensure_positive(strings.left_arrow.trim().len(), "left_arrow", "calendar-new-arrows")?;
        ensure_positive(strings.right_arrow.trim().len(), "right_arrow", "calendar-new-arrows")?;

        Ok(Self {
            context,
            strings,
            start_date,
            end_date: config.end_date,
            include_past: config.include_past,
            today,
        })
    }

    pub fn render(&self, event: &InteractionEvent) -> WidgetResult<Outcome<NaiveDate>> {
        let state = CalendarState::decode(&event.payload)?;
        let argument = event.argument();
        let navigating = argument.contains(self.strings.left_arrow.as_str())
            || argument.contains(self.strings.right_arrow.as_str());

        let displayed = match (navigating, state.month_to_display, state.selected_date) {
            (true, Some(month), _) => month,
            (_, _, Some(selected)) => return Ok(self.resolve(event, selected)),
            _ => self.today,
        };

        let mut base = self.context.base_payload(&event.payload);
        base.remove(SELECTED_DATE_KEY);

        let mut markup = Markup::new();
        self.add_year_row(&mut markup, &base, displayed);
        self.add_month_row(&mut markup, &base, displayed);
        self.add_weekday_row(&mut markup);
        let day_rows = self.add_day_rows(&mut markup, &base, displayed);

        tracing::debug!(
            widget = "calendar",
            displayed = %displayed,
            day_rows,
            "rendered calendar month"
        );

        Ok(Outcome::Pending(Frame {
            text: self.strings.select_date.clone(),
            markup: self.context.attach_extra(markup),
            payload: base,
        }))
    }

    pub async fn display(
        &self,
        event: &InteractionEvent,
        reconciler: &Reconciler,
    ) -> WidgetResult<Option<NaiveDate>> {
        let outcome = self.render(event)?;
        deliver_outcome(reconciler, event, outcome).await
    }

    /// Reads the selected date from an event without rendering anything.
    pub fn selected_value(event: &InteractionEvent) -> WidgetResult<NaiveDate> {
        CalendarState::decode(&event.payload)?
            .selected_date
            .ok_or_else(|| {
                MissingSelectionSnafu {
                    stage: "calendar-selected-value",
                    key: SELECTED_DATE_KEY,
                }
                .build()
            })
    }

    fn resolve(&self, event: &InteractionEvent, selected: NaiveDate) -> Outcome<NaiveDate> {
        let mut payload = event.payload.clone();
        CalendarState::clear(&mut payload);

        tracing::info!(widget = "calendar", selected = %selected, "date selected");

        Outcome::Resolved {
            value: selected,
            confirmation: Frame {
                text: self.strings.date_selected.clone(),
                markup: Markup::new(),
                payload,
            },
        }
    }

    fn prev_and_next_year(&self, displayed: NaiveDate) -> (Option<NaiveDate>, Option<NaiveDate>) {
        // Without past dates, going back a year lands on the current real-world month,
        // but never before the start month.
        let month = if self.include_past { 1 } else { self.today.month() };
        let prev_year = NaiveDate::from_ymd_opt(displayed.year() - 1, month, 1).map(|target| {
            match self.start_date.with_day(1) {
                Some(start_month) if !self.include_past => target.max(start_month),
                _ => target,
            }
        });
        let next_year = NaiveDate::from_ymd_opt(displayed.year() + 1, 1, 1);
        (prev_year, next_year)
    }

    fn add_year_row(&self, markup: &mut Markup, base: &Payload, displayed: NaiveDate) {
        let (prev_year, next_year) = self.prev_and_next_year(displayed);
        let lower_limit = !self.include_past && displayed.year() <= self.start_date.year();
        let upper_limit = displayed.year() >= self.end_date.year();

        let left = match prev_year {
            Some(target) if !lower_limit => self.arrow(&self.strings.left_arrow, base, target),
            _ => blank(),
        };
        let right = match next_year {
            Some(target) if !upper_limit => self.arrow(&self.strings.right_arrow, base, target),
            _ => blank(),
        };

        markup.push_row(vec![
            left,
            Control::inert(displayed.year().to_string()).with_payload(base.clone()),
            right,
        ]);
    }

    fn add_month_row(&self, markup: &mut Markup, base: &Payload, displayed: NaiveDate) {
        let shown = (displayed.year(), displayed.month());
        let lower_limit =
            !self.include_past && shown <= (self.start_date.year(), self.start_date.month());
        let upper_limit = shown >= (self.end_date.year(), self.end_date.month());

        let left = match displayed.checked_sub_months(Months::new(1)) {
            Some(target) if !lower_limit => self.arrow(&self.strings.left_arrow, base, target),
            _ => blank(),
        };
        let right = match displayed.checked_add_months(Months::new(1)) {
            Some(target) if !upper_limit => self.arrow(&self.strings.right_arrow, base, target),
            _ => blank(),
        };
        let month_name = self
            .strings
            .months
            .get(displayed.month0() as usize)
            .cloned()
            .unwrap_or_default();

        markup.push_row(vec![
            left,
            Control::inert(month_name).with_payload(base.clone()),
            right,
        ]);
    }

    fn add_weekday_row(&self, markup: &mut Markup) {
        markup.push_row(
            self.strings
                .weekdays
                .iter()
                .map(|weekday| Control::inert(weekday.clone()))
                .collect(),
        );
    }

    fn add_day_rows(&self, markup: &mut Markup, base: &Payload, displayed: NaiveDate) -> usize {
        let mut appended = 0;

        for week in month_weeks(displayed) {
            let mut any_visible = false;
            let row = week
                .into_iter()
                .map(|day| {
                    if self.is_day_visible(day, displayed) {
                        any_visible = true;
                        self.day_control(base, day)
                    } else {
                        Control::inert("")
                    }
                })
                .collect::<Vec<_>>();

            if any_visible {
                markup.push_row(row);
                appended += 1;
            }
        }

        appended
    }

    fn is_day_visible(&self, day: NaiveDate, displayed: NaiveDate) -> bool {
        let after_start = self.include_past || day >= self.start_date;
        let same_month = day.year() == displayed.year() && day.month() == displayed.month();
        after_start && day <= self.end_date && same_month
    }

    fn day_control(&self, base: &Payload, day: NaiveDate) -> Control {
        let iso = format_date(day);
        Control::new(
            day.day().to_string(),
            format!("{} {iso}", self.context.command),
            base.clone().with(SELECTED_DATE_KEY, iso),
        )
    }

    fn arrow(&self, label: &str, base: &Payload, target: NaiveDate) -> Control {
        Control::new(
            label,
            format!("{} {label}", self.context.command),
            base.clone().with(MONTH_TO_DISPLAY_KEY, format_date(target)),
        )
    }
}

fn blank() -> Control {
    Control::inert(" ")
}

/// Monday-first weeks covering the month of `displayed`, including the days of
/// adjacent months that share a week with it.
fn month_weeks(displayed: NaiveDate) -> Vec<Vec<NaiveDate>> {
    let Some(first) = displayed.with_day(1) else {
        return Vec::new();
    };
    let lead = u64::from(first.weekday().num_days_from_monday());
    let Some(mut week_start) = first.checked_sub_days(Days::new(lead)) else {
        return Vec::new();
    };

    let mut weeks = Vec::new();
    loop {
        weeks.push(week_start.iter_days().take(DAYS_IN_WEEK).collect());
        match week_start.checked_add_days(Days::new(DAYS_IN_WEEK as u64)) {
            Some(next) if next.year() == first.year() && next.month() == first.month() => {
                week_start = next;
            }
            _ => break,
        }
    }

    weeks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WidgetError;
    use crate::ids::{ChatId, MessageId};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
    }

    fn today() -> NaiveDate {
        date(2024, 5, 15)
    }

    fn calendar(config: CalendarConfig) -> Calendar {
        Calendar::new_at(
            WidgetContext::new("/date"),
            config,
            CalendarStrings::default(),
            today(),
        )
        .expect("valid calendar")
    }

    fn pending(outcome: Outcome<NaiveDate>) -> Frame {
        match outcome {
            Outcome::Pending(frame) => frame,
            Outcome::Resolved { value, .. } => panic!("unexpected resolution to {value}"),
        }
    }

    fn open(calendar: &Calendar) -> Frame {
        pending(
            calendar
                .render(&InteractionEvent::new(ChatId::new_v7(), "/date"))
                .expect("render"),
        )
    }

    fn click(frame: &Frame, label: &str) -> InteractionEvent {
        let control = frame.markup.find_by_label(label).expect("control present");
        InteractionEvent::from_click(ChatId::new_v7(), MessageId::new_v7(), control)
    }

    #[test]
    fn first_render_starts_at_today_and_hides_past_days() {
        let frame = open(&calendar(CalendarConfig::default()));
        let rows = frame.markup.labels();

        assert_eq!(frame.text, "Select a date");
        assert_eq!(rows[0], vec![" ", "2024", "➡️"]);
        assert_eq!(rows[1], vec![" ", "May", "➡️"]);
        assert_eq!(rows[2], vec!["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"]);
        // Weeks entirely before the 15th are dropped; partial weeks keep blank cells.
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[3], vec!["", "", "15", "16", "17", "18", "19"]);
        assert_eq!(rows[5], vec!["27", "28", "29", "30", "31", "", ""]);
    }

    #[test]
    fn include_past_shows_the_whole_month_with_blank_neighbours() {
        let frame = open(&calendar(CalendarConfig {
            include_past: true,
            ..CalendarConfig::default()
        }));
        let rows = frame.markup.labels();

        assert_eq!(rows[0][0], "⬅️");
        assert_eq!(rows[1][0], "⬅️");
        assert_eq!(rows.len(), 3 + 5);
        assert_eq!(rows[3], vec!["", "", "1", "2", "3", "4", "5"]);
    }

    #[test]
    fn blank_cells_are_inert_and_days_carry_the_selection() {
        let frame = open(&calendar(CalendarConfig::default()));
        let week = &frame.markup.rows()[3];

        assert!(week[0].is_inert());
        assert_eq!(week[2].command, "/date 2024-05-15");
        assert_eq!(
            week[2].payload.get(SELECTED_DATE_KEY).and_then(|value| value.as_str()),
            Some("2024-05-15")
        );
        assert!(week[2].payload.is_widget_round());
    }

    #[test]
    fn arrows_navigate_by_month_and_year() {
        let cal = calendar(CalendarConfig::default());
        let frame = open(&cal);

        let next_month = frame.markup.rows()[1][2].clone();
        assert_eq!(next_month.command, "/date ➡️");
        assert_eq!(
            next_month.payload.get(MONTH_TO_DISPLAY_KEY).and_then(|value| value.as_str()),
            Some("2024-06-15")
        );

        let june = pending(
            cal.render(&InteractionEvent::from_click(
                ChatId::new_v7(),
                MessageId::new_v7(),
                &next_month,
            ))
            .expect("render june"),
        );
        let rows = june.markup.labels();
        assert_eq!(rows[1], vec!["⬅️", "Jun", "➡️"]);
        assert_eq!(rows[3], vec!["", "", "", "", "", "1", "2"]);

        let next_year = frame.markup.rows()[0][2].clone();
        assert_eq!(
            next_year.payload.get(MONTH_TO_DISPLAY_KEY).and_then(|value| value.as_str()),
            Some("2025-01-01")
        );
    }

    #[test]
    fn previous_year_clamps_to_current_month_without_past() {
        let cal = calendar(CalendarConfig::default());
        let event = InteractionEvent::new(ChatId::new_v7(), "/date ➡️")
            .with_payload(Payload::new().with(MONTH_TO_DISPLAY_KEY, "2026-03-01"));
        let frame = pending(cal.render(&event).expect("render"));

        let prev_year = &frame.markup.rows()[0][0];
        assert_eq!(
            prev_year.payload.get(MONTH_TO_DISPLAY_KEY).and_then(|value| value.as_str()),
            Some("2025-05-01")
        );
    }

    #[test]
    fn previous_year_never_lands_before_the_start_month() {
        for (start, shown, expected) in [
            (date(2024, 11, 10), "2025-03-01", "2024-11-01"),
            (date(2023, 8, 1), "2024-03-01", "2023-08-01"),
        ] {
            let cal = calendar(CalendarConfig {
                start_date: Some(start),
                ..CalendarConfig::default()
            });
            let event = InteractionEvent::new(ChatId::new_v7(), "/date ➡️")
                .with_payload(Payload::new().with(MONTH_TO_DISPLAY_KEY, shown));
            let frame = pending(cal.render(&event).expect("render"));

            let prev_year = frame.markup.rows()[0][0].clone();
            assert_eq!(
                prev_year.payload.get(MONTH_TO_DISPLAY_KEY).and_then(|value| value.as_str()),
                Some(expected)
            );

            let landed = pending(
                cal.render(&InteractionEvent::from_click(
                    ChatId::new_v7(),
                    MessageId::new_v7(),
                    &prev_year,
                ))
                .expect("render previous year"),
            );
            let rows = landed.markup.labels();
            assert!(rows.len() > 3, "no selectable day after moving back from {shown}");
            assert!(rows[3..].iter().flatten().any(|label| *label == start.day().to_string()));
        }
    }

    #[test]
    fn lower_bound_compares_year_and_month_together() {
        let cal = calendar(CalendarConfig {
            start_date: Some(date(2024, 11, 10)),
            ..CalendarConfig::default()
        });

        let render_month = |raw: &str| {
            let event = InteractionEvent::new(ChatId::new_v7(), "/date ⬅️")
                .with_payload(Payload::new().with(MONTH_TO_DISPLAY_KEY, raw));
            pending(cal.render(&event).expect("render")).markup.labels()[1][0].to_string()
        };

        assert_eq!(render_month("2024-11-01"), " ");
        assert_eq!(render_month("2025-01-01"), "⬅️");
        assert_eq!(render_month("2025-11-01"), "⬅️");
    }

    #[test]
    fn end_date_suppresses_forward_navigation_and_later_days() {
        let cal = calendar(CalendarConfig {
            end_date: date(2024, 5, 20),
            ..CalendarConfig::default()
        });
        let frame = open(&cal);
        let rows = frame.markup.labels();

        assert_eq!(rows[0][2], " ");
        assert_eq!(rows[1][2], " ");
        assert!(frame.markup.rows()[1][2].is_inert());
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[4], vec!["20", "", "", "", "", "", ""]);
    }

    #[test]
    fn never_renders_a_day_outside_the_window() {
        let start = date(2024, 5, 10);
        let end = date(2024, 7, 3);
        let cal = calendar(CalendarConfig {
            start_date: Some(start),
            end_date: end,
            include_past: false,
        });

        for raw in ["2024-05-01", "2024-06-01", "2024-07-01"] {
            let event = InteractionEvent::new(ChatId::new_v7(), "/date ➡️")
                .with_payload(Payload::new().with(MONTH_TO_DISPLAY_KEY, raw));
            let frame = pending(cal.render(&event).expect("render"));
            for control in frame.markup.rows()[3..].iter().flatten() {
                if let Some(selected) = control.payload.date(SELECTED_DATE_KEY, "test").expect("date") {
                    assert!(selected >= start && selected <= end, "{selected} leaked");
                }
            }
        }
    }

    #[test]
    fn day_click_resolves_and_clears_calendar_keys() {
        let cal = calendar(CalendarConfig::default());
        let frame = open(&cal);
        let event = click(&frame, "20");

        match cal.render(&event).expect("render") {
            Outcome::Resolved {
                value,
                confirmation,
            } => {
                assert_eq!(value, date(2024, 5, 20));
                assert_eq!(confirmation.text, "Date selected");
                assert!(confirmation.markup.is_empty());
                assert!(!confirmation.payload.contains_key(SELECTED_DATE_KEY));
                assert!(!confirmation.payload.contains_key(MONTH_TO_DISPLAY_KEY));
            }
            Outcome::Pending(_) => panic!("day click must resolve"),
        }
    }

    #[test]
    fn corrupted_selection_is_reported() {
        let cal = calendar(CalendarConfig::default());
        let event = InteractionEvent::new(ChatId::new_v7(), "/date 2024-05-20")
            .with_payload(Payload::new().with(SELECTED_DATE_KEY, "20/05/2024"));

        assert!(matches!(
            cal.render(&event),
            Err(WidgetError::DecodeState { key: SELECTED_DATE_KEY, .. })
        ));
    }

    #[test]
    fn selected_value_requires_a_selection() {
        let event = InteractionEvent::new(ChatId::new_v7(), "/date");
        assert!(matches!(
            Calendar::selected_value(&event),
            Err(WidgetError::MissingSelection { .. })
        ));
    }

    #[test]
    fn start_after_end_is_rejected() {
        let result = Calendar::new_at(
            WidgetContext::new("/date"),
            CalendarConfig {
                start_date: Some(date(2024, 6, 1)),
                end_date: date(2024, 5, 1),
                include_past: false,
            },
            CalendarStrings::default(),
            today(),
        );
        assert!(matches!(result, Err(WidgetError::InvalidConfig { .. })));
    }

    #[test]
    fn state_round_trips_through_payload() {
        let state = CalendarState {
            month_to_display: Some(date(2024, 2, 29)),
            selected_date: Some(date(2025, 1, 1)),
        };
        assert_eq!(CalendarState::decode(&state.to_payload()).expect("decode"), state);
    }
}
