//! Ready-made check-in pushes: the three reminder windows and the alert-sent notice.

// self
use crate::{
	_prelude::*,
	message::{AndroidPriority, NotificationRequest},
};

/// Android channel for pushes that must interrupt the user.
pub const URGENT_CHANNEL: &str = "urgent_alerts";
/// Android channel for routine reminders.
pub const REMINDER_CHANNEL: &str = "check_in_reminders";
/// Half-width of every reminder window.
pub const WINDOW_TOLERANCE: Duration = Duration::minutes(30);

const CLICK_ACTION: &str = "FLUTTER_NOTIFICATION_CLICK";
const HOME_ROUTE: &str = "/";

/// Reminders sent ahead of a due check-in, longest lead first.
pub const REMINDER_WINDOWS: [ReminderWindow; 3] = [
	ReminderWindow {
		lead: Duration::hours(24),
		title: "Check-in Reminder",
		message: "Check in tomorrow to let your contacts know you're OK",
		urgent: false,
	},
	ReminderWindow {
		lead: Duration::hours(6),
		title: "Check-in Due Soon",
		message: "Your check-in is due in about 6 hours",
		urgent: false,
	},
	ReminderWindow {
		lead: Duration::hours(1),
		title: "Final Reminder",
		message: "Check in within 1 hour to avoid alerting your contacts",
		urgent: true,
	},
];

/// One reminder horizon and the notification it produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReminderWindow {
	/// Time between the reminder and the check-in deadline.
	pub lead: Duration,
	/// Notification title.
	pub title: &'static str,
	/// Notification body.
	pub message: &'static str,
	/// Whether the reminder uses the urgent channel and sound.
	pub urgent: bool,
}
impl ReminderWindow {
	/// Returns `[start, end)` of deadlines that fall in this window at `now`.
	pub fn bounds(&self, now: OffsetDateTime) -> (OffsetDateTime, OffsetDateTime) {
		let target = now + self.lead;

		(target - WINDOW_TOLERANCE, target + WINDOW_TOLERANCE)
	}

	/// Returns `true` when a check-in due at `due` should get this reminder at `now`.
	pub fn contains(&self, now: OffsetDateTime, due: OffsetDateTime) -> bool {
		let (start, end) = self.bounds(now);

		start <= due && due < end
	}

	/// Builds the reminder push for `device_token`.
	pub fn request_for(&self, device_token: impl Into<String>) -> NotificationRequest {
		let (priority, channel) = if self.urgent {
			(AndroidPriority::High, URGENT_CHANNEL)
		} else {
			(AndroidPriority::Normal, REMINDER_CHANNEL)
		};
		let request = NotificationRequest::new(device_token, self.title, self.message)
			.with_data("click_action", CLICK_ACTION)
			.with_data("urgent", self.urgent.to_string())
			.with_data("route", HOME_ROUTE)
			.with_android_priority(priority)
			.with_android_channel(channel)
			.with_apns_badge(1);

		if self.urgent { request.with_apns_sound("default") } else { request }
	}
}

/// Builds the push telling the user their contacts were just alerted.
pub fn alert_sent_request(device_token: impl Into<String>) -> NotificationRequest {
	NotificationRequest::new(
		device_token,
		"Alert Sent",
		"Your emergency contacts have been notified. Check in now to let them know you're OK.",
	)
	.with_data("urgent", "true")
	.with_data("route", HOME_ROUTE)
	.with_data("click_action", CLICK_ACTION)
	.with_android_priority(AndroidPriority::High)
	.with_android_channel(URGENT_CHANNEL)
}
