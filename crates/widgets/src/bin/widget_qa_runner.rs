use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use snafu::{OptionExt, ResultExt, Snafu};
use tracing_subscriber::EnvFilter;

use bubbles_widgets::memory::{MemoryTransport, TransportOp};
use bubbles_widgets::widgets::pagination::PaginationState;
use bubbles_widgets::{
    Calendar, CalendarConfig, Carousel, CarouselConfig, ChatId, CheckboxContent, Checklist,
    Checktable, ContentItem, Control, InteractionEvent, MessageContent, MessageId, Outcome,
    Pagination, PaginationConfig, Reconciler, SettingsStore, StateCodec, WidgetContext,
    WidgetError, WidgetSettings,
};

#[derive(Debug, Clone)]
struct RunnerArgs {
    scenario: Scenario,
    settings_path: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum Scenario {
    CalendarPick,
    CarouselNavigate,
    CarouselSelect,
    ChecklistToggle,
    ChecktableRender,
    PaginationFanout,
    PaginationNavigate,
    All,
}

impl Scenario {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "calendar_pick" => Some(Self::CalendarPick),
            "carousel_navigate" => Some(Self::CarouselNavigate),
            "carousel_select" => Some(Self::CarouselSelect),
            "checklist_toggle" => Some(Self::ChecklistToggle),
            "checktable_render" => Some(Self::ChecktableRender),
            "pagination_fanout" => Some(Self::PaginationFanout),
            "pagination_navigate" => Some(Self::PaginationNavigate),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::CalendarPick => "calendar_pick",
            Self::CarouselNavigate => "carousel_navigate",
            Self::CarouselSelect => "carousel_select",
            Self::ChecklistToggle => "checklist_toggle",
            Self::ChecktableRender => "checktable_render",
            Self::PaginationFanout => "pagination_fanout",
            Self::PaginationNavigate => "pagination_navigate",
            Self::All => "all",
        }
    }
}

#[derive(Debug, Snafu)]
enum RunnerError {
    #[snafu(display("missing required --scenario argument"))]
    MissingScenario { stage: &'static str },
    #[snafu(display("missing value for argument '{arg}'"))]
    MissingArgumentValue {
        stage: &'static str,
        arg: &'static str,
    },
    #[snafu(display("unknown scenario '{raw}'"))]
    UnknownScenario { stage: &'static str, raw: String },
    #[snafu(display("unknown argument '{raw}'"))]
    UnknownArgument { stage: &'static str, raw: String },
    #[snafu(display("widget call failed at `{stage}`: {source}"))]
    Widget {
        stage: &'static str,
        source: WidgetError,
    },
    #[snafu(display("scenario '{scenario}' failed: {reason}"))]
    ScenarioFailed {
        stage: &'static str,
        scenario: &'static str,
        reason: String,
    },
}

type RunnerResult<T> = Result<T, RunnerError>;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = run().await {
        println!("runner_ok=false");
        eprintln!("runner_error={error}");
        std::process::exit(1);
    }
}

async fn run() -> RunnerResult<()> {
    let args = parse_args(env::args().skip(1))?;
    println!("scenario={}", args.scenario.name());

    let store = match args.settings_path.as_deref() {
        Some(path) => SettingsStore::new(PathBuf::from(path)),
        None => SettingsStore::load(),
    };
    println!("settings_path={}", store.config_path().display());
    let settings = store.settings();

    match args.scenario {
        Scenario::CalendarPick => run_calendar_pick(&settings).await?,
        Scenario::CarouselNavigate => run_carousel_navigate(&settings).await?,
        Scenario::CarouselSelect => run_carousel_select(&settings).await?,
        Scenario::ChecklistToggle => run_checklist_toggle(&settings).await?,
        Scenario::ChecktableRender => run_checktable_render(&settings).await?,
        Scenario::PaginationFanout => run_pagination_fanout(&settings).await?,
        Scenario::PaginationNavigate => run_pagination_navigate(&settings).await?,
        Scenario::All => {
            run_calendar_pick(&settings).await?;
            run_carousel_navigate(&settings).await?;
            run_carousel_select(&settings).await?;
            run_checklist_toggle(&settings).await?;
            run_checktable_render(&settings).await?;
            run_pagination_fanout(&settings).await?;
            run_pagination_navigate(&settings).await?;
        }
    }

    println!("runner_ok=true");
    Ok(())
}

fn parse_args(args: impl IntoIterator<Item = String>) -> RunnerResult<RunnerArgs> {
    let mut scenario = None;
    let mut settings_path = None;
    let mut pending = args.into_iter();

    while let Some(argument) = pending.next() {
        match argument.as_str() {
            "--scenario" => {
                let value = pending.next().context(MissingArgumentValueSnafu {
                    stage: "parse-args-scenario-value",
                    arg: "--scenario",
                })?;

                let parsed = Scenario::parse(&value).context(UnknownScenarioSnafu {
                    stage: "parse-args-scenario",
                    raw: value,
                })?;
                scenario = Some(parsed);
            }
            "--settings" => {
                let value = pending.next().context(MissingArgumentValueSnafu {
                    stage: "parse-args-settings-value",
                    arg: "--settings",
                })?;
                settings_path = Some(value);
            }
            _ => {
                return UnknownArgumentSnafu {
                    stage: "parse-args",
                    raw: argument,
                }
                .fail();
            }
        }
    }

    Ok(RunnerArgs {
        scenario: scenario.context(MissingScenarioSnafu {
            stage: "parse-args-scenario-required",
        })?,
        settings_path,
    })
}

fn memory_host() -> (Arc<MemoryTransport>, Reconciler) {
    let transport = Arc::new(MemoryTransport::new());
    (transport.clone(), Reconciler::new(transport))
}

fn check(
    condition: bool,
    stage: &'static str,
    scenario: &'static str,
    reason: impl FnOnce() -> String,
) -> RunnerResult<()> {
    if condition {
        return Ok(());
    }
    ScenarioFailedSnafu {
        stage,
        scenario,
        reason: reason(),
    }
    .fail()
}

async fn last_message_id(
    transport: &MemoryTransport,
    scenario: &'static str,
) -> RunnerResult<MessageId> {
    transport
        .messages()
        .await
        .last()
        .map(|message| message.message_id)
        .context(ScenarioFailedSnafu {
            stage: "scenario-last-message",
            scenario,
            reason: "no message was sent".to_string(),
        })
}

async fn click(
    transport: &MemoryTransport,
    chat_id: ChatId,
    message_id: MessageId,
    label: &str,
    scenario: &'static str,
) -> RunnerResult<InteractionEvent> {
    let control = transport
        .message(message_id)
        .await
        .and_then(|message| message.content.markup.find_by_label(label).cloned())
        .context(ScenarioFailedSnafu {
            stage: "scenario-click",
            scenario,
            reason: format!("no control labelled '{label}' on message {message_id}"),
        })?;
    Ok(InteractionEvent::from_click(chat_id, message_id, &control))
}

fn letters() -> Vec<ContentItem> {
    ["a", "b", "c", "d", "e"].into_iter().map(ContentItem::from).collect()
}

async fn run_calendar_pick(settings: &WidgetSettings) -> RunnerResult<()> {
    const SCENARIO: &str = "calendar_pick";
    let calendar = Calendar::new(
        WidgetContext::new("/date"),
        CalendarConfig::default(),
        settings.calendar.clone(),
    )
    .context(WidgetSnafu {
        stage: "calendar-new",
    })?;

    let opened = calendar
        .render(&InteractionEvent::new(ChatId::new_v7(), "/date"))
        .context(WidgetSnafu {
            stage: "calendar-open",
        })?;
    let first_day = opened
        .frame()
        .markup
        .rows()
        .iter()
        .skip(3)
        .flatten()
        .find(|control| !control.is_inert())
        .cloned()
        .context(ScenarioFailedSnafu {
            stage: "calendar-first-day",
            scenario: SCENARIO,
            reason: "no selectable day in the current month".to_string(),
        })?;

    let event = InteractionEvent::from_click(ChatId::new_v7(), MessageId::new_v7(), &first_day);
    let resolved = calendar.render(&event).context(WidgetSnafu {
        stage: "calendar-pick",
    })?;
    let selected = match resolved {
        Outcome::Resolved { value, .. } => value,
        Outcome::Pending(_) => {
            return ScenarioFailedSnafu {
                stage: "calendar-resolve",
                scenario: SCENARIO,
                reason: "day click did not resolve the calendar".to_string(),
            }
            .fail();
        }
    };

    println!("calendar_selected={selected}");
    Ok(())
}

async fn run_carousel_navigate(settings: &WidgetSettings) -> RunnerResult<()> {
    const SCENARIO: &str = "carousel_navigate";
    let (transport, reconciler) = memory_host();
    let chat_id = ChatId::new_v7();
    let carousel = Carousel::new(
        WidgetContext::new("/pick"),
        CarouselConfig {
            looping: false,
            ..CarouselConfig::new(letters(), "Pick a letter")
        },
        settings.carousel.clone(),
    )
    .context(WidgetSnafu {
        stage: "carousel-new",
    })?;

    carousel
        .display(&InteractionEvent::new(chat_id, "/pick"), &reconciler)
        .await
        .context(WidgetSnafu {
            stage: "carousel-open",
        })?;
    let message_id = last_message_id(&transport, SCENARIO).await?;
    let next = click(
        &transport,
        chat_id,
        message_id,
        &settings.carousel.right_arrow,
        SCENARIO,
    )
    .await?;
    carousel
        .display(&next, &reconciler)
        .await
        .context(WidgetSnafu {
            stage: "carousel-next",
        })?;

    let ops = transport
        .calls()
        .await
        .iter()
        .map(|call| call.op)
        .collect::<Vec<_>>();
    check(
        ops == [TransportOp::Send, TransportOp::Update],
        "carousel-navigate-ops",
        SCENARIO,
        || format!("expected send then update, got {ops:?}"),
    )?;

    let window = transport
        .message(message_id)
        .await
        .map(|message| {
            message
                .content
                .markup
                .controls()
                .filter(|control| {
                    control.label != settings.carousel.left_arrow
                        && control.label != settings.carousel.right_arrow
                })
                .map(|control| control.label.clone())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    check(
        window == ["d", "e"],
        "carousel-navigate-window",
        SCENARIO,
        || format!("expected tail window d,e, got {window:?}"),
    )?;

    println!("carousel_window={}", window.join(","));
    Ok(())
}

async fn run_carousel_select(settings: &WidgetSettings) -> RunnerResult<()> {
    const SCENARIO: &str = "carousel_select";
    let (transport, reconciler) = memory_host();
    let chat_id = ChatId::new_v7();
    let carousel = Carousel::new(
        WidgetContext::new("/pick"),
        CarouselConfig::with_defaults(letters(), "Your letter:", &settings.defaults),
        settings.carousel.clone(),
    )
    .context(WidgetSnafu {
        stage: "carousel-new",
    })?;

    carousel
        .display(&InteractionEvent::new(chat_id, "/pick"), &reconciler)
        .await
        .context(WidgetSnafu {
            stage: "carousel-open",
        })?;
    let message_id = last_message_id(&transport, SCENARIO).await?;
    let pick = click(&transport, chat_id, message_id, "a", SCENARIO).await?;
    let selected = carousel
        .display(&pick, &reconciler)
        .await
        .context(WidgetSnafu {
            stage: "carousel-select",
        })?;

    check(
        selected.as_deref() == Some("a"),
        "carousel-select-value",
        SCENARIO,
        || format!("expected 'a', got {selected:?}"),
    )?;
    let confirmation = transport.message(message_id).await;
    check(
        confirmation
            .as_ref()
            .is_some_and(|message| message.content.markup.is_empty()),
        "carousel-select-confirmation",
        SCENARIO,
        || "confirmation still shows controls".to_string(),
    )?;

    println!(
        "carousel_confirmation={}",
        confirmation
            .map(|message| message.content.text)
            .unwrap_or_default()
    );
    Ok(())
}

async fn run_checklist_toggle(settings: &WidgetSettings) -> RunnerResult<()> {
    const SCENARIO: &str = "checklist_toggle";
    let (transport, reconciler) = memory_host();
    let chat_id = ChatId::new_v7();
    let strings = settings.checklist.clone();
    let checklist = Checklist::new(
        WidgetContext::new("/toppings"),
        vec![
            ContentItem::from("cheese"),
            ContentItem::from(["olives", "basil"]),
        ],
        "Toppings",
        strings.clone(),
    );

    checklist
        .display(&InteractionEvent::new(chat_id, "/toppings"), &reconciler)
        .await
        .context(WidgetSnafu {
            stage: "checklist-open",
        })?;
    let message_id = last_message_id(&transport, SCENARIO).await?;

    let unchecked = format!("{} basil", strings.unchecked);
    let check_basil = click(&transport, chat_id, message_id, &unchecked, SCENARIO).await?;
    let toggled = checklist
        .display(&check_basil, &reconciler)
        .await
        .context(WidgetSnafu {
            stage: "checklist-check",
        })?;

    let checked = format!("{} basil", strings.checked);
    let uncheck_basil = click(&transport, chat_id, message_id, &checked, SCENARIO).await?;
    let before_uncheck = Checklist::checked_items(&uncheck_basil).context(WidgetSnafu {
        stage: "checklist-checked-items",
    })?;
    checklist
        .display(&uncheck_basil, &reconciler)
        .await
        .context(WidgetSnafu {
            stage: "checklist-uncheck",
        })?;

    check(
        toggled.as_deref() == Some("basil") && before_uncheck == ["basil"],
        "checklist-toggle-pair",
        SCENARIO,
        || format!("toggled {toggled:?}, checked before uncheck {before_uncheck:?}"),
    )?;
    let restored = click(&transport, chat_id, message_id, &unchecked, SCENARIO)
        .await
        .is_ok();
    check(restored, "checklist-restored", SCENARIO, || {
        "basil is still checked after the second toggle".to_string()
    })?;

    println!("checklist_toggle_pair=true");
    Ok(())
}

async fn run_checktable_render(settings: &WidgetSettings) -> RunnerResult<()> {
    const SCENARIO: &str = "checktable_render";
    let (transport, reconciler) = memory_host();
    let quantity = || {
        CheckboxContent::new("Quantity", "/quantity")
            .with_mapping([(1_i64, "One"), (2, "Two")])
            .context(WidgetSnafu {
                stage: "checkbox-mapping",
            })
    };
    let chosen = quantity()?.with_value(1).context(WidgetSnafu {
        stage: "checkbox-value",
    })?;
    let event = InteractionEvent::new(ChatId::new_v7(), "/form");

    let mut labels = Vec::new();
    for field in [quantity()?, chosen] {
        let table = Checktable::new(
            WidgetContext::new("/form"),
            vec![field],
            "Order",
            "/uncheck",
            settings.checktable.clone(),
        )
        .context(WidgetSnafu {
            stage: "checktable-new",
        })?;
        let delivery = table.display(&event, &reconciler).await.context(WidgetSnafu {
            stage: "checktable-display",
        })?;
        let value_label = transport
            .message(delivery.message_id)
            .await
            .and_then(|message| {
                message
                    .content
                    .markup
                    .rows()
                    .first()
                    .and_then(|row| row.get(1))
                    .map(|control: &Control| control.label.clone())
            })
            .unwrap_or_default();
        labels.push(value_label);
    }

    let expected = [settings.checktable.choose.clone(), "One".to_string()];
    check(labels == expected, "checktable-labels", SCENARIO, || {
        format!("expected {expected:?}, got {labels:?}")
    })?;

    println!("checktable_value_labels={}", labels.join(","));
    Ok(())
}

fn news(settings: &WidgetSettings) -> RunnerResult<Pagination> {
    let content = (1..=7)
        .map(|index| MessageContent::new(format!("news item {index}")))
        .collect();
    Pagination::new(
        WidgetContext::new("/news"),
        content,
        PaginationConfig { page_size: 3 },
        settings.pagination.clone(),
    )
    .context(WidgetSnafu {
        stage: "pagination-new",
    })
}

async fn run_pagination_fanout(settings: &WidgetSettings) -> RunnerResult<()> {
    const SCENARIO: &str = "pagination_fanout";
    let transport = Arc::new(MemoryTransport::ignoring_requested_ids());
    let reconciler =
        Reconciler::new(transport.clone()).with_delay(settings.defaults.pagination_delay());
    let pagination = news(settings)?;

    let report = pagination
        .display(&InteractionEvent::new(ChatId::new_v7(), "/news"), &reconciler)
        .await
        .context(WidgetSnafu {
            stage: "pagination-first-page",
        })?;

    let last = match report.message_ids.last() {
        Some(message_id) => transport.message(*message_id).await,
        None => None,
    };
    let carried_ids = last
        .as_ref()
        .and_then(|message| message.content.markup.controls().last().cloned())
        .and_then(|control| PaginationState::decode(&control.payload).ok())
        .map(|state| state.message_ids)
        .unwrap_or_default();
    check(
        carried_ids == report.message_ids,
        "pagination-fanout-ids",
        SCENARIO,
        || "controls on the last slot do not carry the host ids".to_string(),
    )?;

    println!("pagination_slots={}", report.message_ids.len());
    println!("pagination_calls={}", transport.calls().await.len());
    Ok(())
}

async fn run_pagination_navigate(settings: &WidgetSettings) -> RunnerResult<()> {
    const SCENARIO: &str = "pagination_navigate";
    let transport = Arc::new(MemoryTransport::new());
    let reconciler = Reconciler::new(transport.clone());
    let chat_id = ChatId::new_v7();
    let pagination = news(settings)?;

    let mut report = pagination
        .display(&InteractionEvent::new(chat_id, "/news"), &reconciler)
        .await
        .context(WidgetSnafu {
            stage: "pagination-first-page",
        })?;

    // Two forward clicks reach the short last page.
    for _ in 0..2 {
        let last_id = report.message_ids.last().copied().context(ScenarioFailedSnafu {
            stage: "pagination-navigate-last-slot",
            scenario: SCENARIO,
            reason: "no slots were delivered".to_string(),
        })?;
        let forward = transport
            .message(last_id)
            .await
            .and_then(|message| message.content.markup.controls().last().cloned())
            .context(ScenarioFailedSnafu {
                stage: "pagination-navigate-forward",
                scenario: SCENARIO,
                reason: "last slot has no forward control".to_string(),
            })?;
        let event = InteractionEvent::from_click(chat_id, last_id, &forward);
        report = pagination
            .display(&event, &reconciler)
            .await
            .context(WidgetSnafu {
                stage: "pagination-navigate",
            })?;
    }

    let texts = transport
        .messages()
        .await
        .into_iter()
        .map(|message| message.content.text)
        .collect::<Vec<_>>();
    let placeholder = settings.pagination.empty_message.clone();
    check(
        texts == ["news item 7".to_string(), placeholder.clone(), placeholder],
        "pagination-navigate-padding",
        SCENARIO,
        || format!("unexpected last page {texts:?}"),
    )?;

    println!("pagination_start_from={}", report.start_from);
    println!("pagination_messages={}", texts.len());
    Ok(())
}
