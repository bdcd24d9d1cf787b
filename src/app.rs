//! # Application Controller
//!
//! Owns the runtime state of one process and turns host events and user intents
//! into calls on the core: [`resolve`], [`reconcile`], [`schedule_tea`] and the
//! [`CountdownTicker`]. The UI adapter reads the resulting [`Screen`] and the
//! view helpers, and never touches the store or the registry itself.
//!
//! ## Screens
//! - **Menu**: date row followed by the six prayers, the next one pre-selected.
//!   Selecting row `n` starts the countdown for tea `n`.
//! - **Countdown**: seconds left until the tea is ready; down cancels, back leaves
//!   it running and exits.
//! - **Ready**: the tea finished steeping; any button exits.

use crate::calendar::CalendarDate;
use crate::countdown::CountdownTicker;
use crate::reconciler::{fired, reconcile, LaunchState};
use crate::resolver::{resolve, Resolution};
use crate::schedule::{ScheduleTable, TableError};
use crate::store::PersistentStore;
use crate::tea::{schedule_tea, tea_for_payload, ScheduleError};
use crate::wakeup::{WakeupEvent, WakeupHandle, WakeupRegistry};
use crate::{Prayer, TeaInfo};
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, info, warn};

/// Screen currently on top of the window stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Countdown,
    /// Tea identified by the fired wakeup's payload is ready
    Ready(i32),
    /// Window stack is empty; the host terminates the app
    Exited,
}

/// One row of the menu.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MenuRow {
    pub title: String,
    /// Time of the prayer, absent on the date row
    pub value: Option<String>,
}

/// Everything that lives for the duration of one process.
#[derive(Debug, Clone)]
pub struct AppRuntimeState {
    /// Displayed day and next prayer
    pub resolution: Resolution,
    /// Wall-clock snapshot shown in the status bar
    pub clock: NaiveDateTime,
    pub screen: Screen,
    /// "Cannot schedule" overlay on the menu
    pub error_visible: bool,
    /// Last remaining-seconds value published by the countdown
    pub remaining: Option<i64>,
    pub ticker: CountdownTicker,
    haptic_pending: bool,
}

/// Top-level controller, generic over the host adapters.
pub struct AppController<S, W> {
    table: ScheduleTable,
    teas: Vec<TeaInfo>,
    store: S,
    registry: W,
    state: AppRuntimeState,
}

impl<S, W> AppController<S, W>
where
    S: PersistentStore,
    W: WakeupRegistry,
{
    /// Start the app: resolve today's schedule, reconcile the persisted alarm and
    /// open the matching screen.
    ///
    /// # Errors
    /// Fails only if the schedule table has no record for the resolved date.
    pub fn launch(
        table: ScheduleTable,
        teas: Vec<TeaInfo>,
        mut store: S,
        registry: W,
        local_now: NaiveDateTime,
    ) -> Result<Self, TableError> {
        let resolution = resolve(&table, local_now)?;
        let launch = reconcile(&mut store, &registry);

        let mut controller = AppController {
            table,
            teas,
            store,
            registry,
            state: AppRuntimeState {
                resolution,
                clock: local_now,
                screen: Screen::Menu,
                error_visible: false,
                remaining: None,
                ticker: CountdownTicker::new(),
                haptic_pending: false,
            },
        };
        controller.apply(launch);
        Ok(controller)
    }

    fn apply(&mut self, launch: LaunchState) {
        match launch {
            LaunchState::Idle => self.state.screen = Screen::Menu,
            LaunchState::CountdownPending(handle) => self.enter_countdown(handle),
            LaunchState::JustFired(payload) => {
                self.state.ticker.clear();
                self.state.remaining = None;
                self.state.error_visible = false;
                self.state.screen = Screen::Ready(payload);
                self.state.haptic_pending = true;
            }
        }
        debug!(screen = ?self.state.screen, "screen changed");
    }

    fn enter_countdown(&mut self, handle: WakeupHandle) {
        self.state.ticker.enter(handle);
        self.state.remaining = None;
        self.state.screen = Screen::Countdown;
    }

    /// Re-resolve the displayed day, e.g. when the minute changes.
    pub fn refresh_day(&mut self, local_now: NaiveDateTime) -> Result<(), TableError> {
        self.state.resolution = resolve(&self.table, local_now)?;
        self.state.clock = local_now;
        Ok(())
    }

    /// Select a menu row. Row `n` schedules tea `n`.
    ///
    /// While the error overlay is shown the press only hides it. A host
    /// rejection shows the overlay and is also returned to the caller.
    pub fn select_row(&mut self, row: usize, now: DateTime<Utc>) -> Result<(), ScheduleError> {
        if self.state.screen != Screen::Menu {
            debug!(row, screen = ?self.state.screen, "select ignored outside menu");
            return Ok(());
        }
        if self.state.error_visible {
            self.state.error_visible = false;
            return Ok(());
        }

        match schedule_tea(&mut self.store, &mut self.registry, &self.teas, row, now) {
            Ok(handle) => {
                self.enter_countdown(handle);
                Ok(())
            }
            Err(err) => {
                if matches!(err, ScheduleError::HostRejected { .. }) {
                    self.state.error_visible = true;
                }
                Err(err)
            }
        }
    }

    pub fn dismiss_error(&mut self) {
        self.state.error_visible = false;
    }

    /// Periodic countdown refresh. Returns the remaining seconds while the
    /// countdown screen is active.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<i64> {
        if self.state.screen != Screen::Countdown {
            return None;
        }
        self.state.remaining = self.state.ticker.tick(&self.registry, now);
        self.state.remaining
    }

    /// Cancel the running countdown and go back to the menu.
    pub fn cancel_countdown(&mut self) {
        if self.state.ticker.cancel(&mut self.store, &mut self.registry) {
            self.state.remaining = None;
        }
        if self.state.screen == Screen::Countdown {
            self.state.screen = Screen::Menu;
        }
    }

    /// Back button: leave the app. A running countdown keeps going on the host.
    pub fn back(&mut self) {
        if self.state.screen == Screen::Countdown {
            self.state.ticker.back();
            info!("leaving app while tea steeps");
        }
        self.state.screen = Screen::Exited;
    }

    /// A wakeup fired while the app was running.
    pub fn on_wakeup_fired(&mut self, event: WakeupEvent) {
        if let Some(handle) = self.state.ticker.handle() {
            if handle != event.handle {
                warn!(expected = %handle, fired = %event.handle, "unexpected wakeup fired");
            }
        }
        let state = fired(&mut self.store, event);
        self.apply(state);
    }

    /// Any button on the ready screen exits.
    pub fn dismiss_ready(&mut self) {
        if matches!(self.state.screen, Screen::Ready(_)) {
            self.state.screen = Screen::Exited;
        }
    }

    /// Consume the pending haptic notification, if any.
    pub fn take_haptic(&mut self) -> bool {
        std::mem::take(&mut self.state.haptic_pending)
    }

    pub fn state(&self) -> &AppRuntimeState {
        &self.state
    }

    pub fn screen(&self) -> Screen {
        self.state.screen
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn registry(&self) -> &W {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut W {
        &mut self.registry
    }

    pub fn teas(&self) -> &[TeaInfo] {
        &self.teas
    }

    /// Tea shown on the ready screen.
    pub fn ready_tea(&self) -> Option<&TeaInfo> {
        match self.state.screen {
            Screen::Ready(payload) => tea_for_payload(&self.teas, payload),
            _ => None,
        }
    }

    /// Date of the displayed day.
    pub fn date(&self) -> CalendarDate {
        self.state.resolution.date
    }

    /// Status bar clock, `HH:MM`.
    pub fn status_time(&self) -> String {
        self.state.clock.format("%H:%M").to_string()
    }

    /// Date row followed by one row per prayer.
    pub fn menu_rows(&self) -> Vec<MenuRow> {
        let day = &self.state.resolution.day;
        let mut rows = Vec::with_capacity(Prayer::ALL.len() + 1);
        rows.push(MenuRow {
            title: self.state.resolution.date.to_string(),
            value: None,
        });
        rows.extend(Prayer::ALL.iter().map(|prayer| {
            let salah = day.salah(*prayer);
            MenuRow {
                title: prayer.name().to_string(),
                value: Some(format!("{:02}:{:02}", salah.hour, salah.minute)),
            }
        }));
        rows
    }

    /// Menu row of the next prayer (row 0 is the date).
    pub fn selected_row(&self) -> usize {
        self.state.resolution.next.index() + 1
    }
}
