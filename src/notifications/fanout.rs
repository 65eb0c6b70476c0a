//! Decides who hears about an action on an event, writes one notification
//! per recipient, and pushes each to its recipient's live channel.
//!
//! Fan-out runs after the primary action has already been persisted and
//! answered; its failures are logged by the caller and never surface in the
//! primary response.

use std::collections::HashSet;

use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::dto::UserRef;
use crate::events::repo::Event;
use crate::realtime::{Dispatcher, WsOutboundEvent};
use crate::rsvps;

use super::dto::{EventRef, NotificationCategory, NotificationView};
use super::repo;

/// Who should hear about an action on an event: the creator plus everyone
/// with an RSVP of any status, minus the actor. Set semantics dedupe a
/// creator who also RSVP'd.
pub fn resolve_recipients(
    creator_id: Uuid,
    rsvp_user_ids: &[Uuid],
    actor_id: Uuid,
) -> HashSet<Uuid> {
    let mut recipients: HashSet<Uuid> = HashSet::new();
    recipients.insert(creator_id);
    recipients.extend(rsvp_user_ids.iter().copied());
    recipients.remove(&actor_id);
    recipients
}

/// Keep only candidates who opted into this category. One batch query;
/// users that no longer exist simply drop out.
pub async fn filter_by_preference(
    db: &PgPool,
    candidates: &HashSet<Uuid>,
    category: NotificationCategory,
) -> anyhow::Result<Vec<Uuid>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = candidates.iter().copied().collect();
    let rows: Vec<(Uuid,)> = sqlx::query_as(&format!(
        "SELECT id FROM users WHERE id = ANY($1) AND {} = TRUE",
        category.preference_column()
    ))
    .bind(&ids)
    .fetch_all(db)
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Canonical notification text. Always names the actor.
pub fn render_text(category: NotificationCategory, actor_name: &str, event_title: &str) -> String {
    match category {
        NotificationCategory::Message => {
            format!("{actor_name} sent a message in \"{event_title}\"")
        }
        NotificationCategory::File => {
            format!("{actor_name} uploaded a file in \"{event_title}\"")
        }
        NotificationCategory::Rsvp => {
            format!("{actor_name} updated their RSVP for \"{event_title}\"")
        }
    }
}

/// Persist one unread notification and return it enriched with the event and
/// actor projections, ready for live delivery without a second lookup.
pub async fn create_notification(
    db: &PgPool,
    recipient_id: Uuid,
    category: NotificationCategory,
    text: &str,
    event: &Event,
    actor: &UserRef,
) -> anyhow::Result<NotificationView> {
    let row = repo::insert(
        db,
        recipient_id,
        category.as_str(),
        text,
        event.id,
        Some(actor.id),
    )
    .await?;
    Ok(NotificationView {
        id: row.id,
        category,
        text: text.to_string(),
        read: row.read,
        created_at: row.created_at,
        event: Some(EventRef {
            id: event.id,
            title: event.title.clone(),
        }),
        actor: Some(actor.clone()),
    })
}

/// Full fan-out pass for one action: resolve, filter, write one row per
/// recipient, push each to that user's channel. Returns how many recipients
/// were notified.
pub async fn fan_out(
    db: &PgPool,
    dispatcher: &dyn Dispatcher,
    event_id: Uuid,
    actor: &UserRef,
    category: NotificationCategory,
) -> anyhow::Result<usize> {
    let event = Event::find_by_id(db, event_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("event {event_id} not found during fan-out"))?;
    let rsvp_user_ids = rsvps::repo::user_ids_for_event(db, event_id).await?;

    let candidates = resolve_recipients(event.creator_id, &rsvp_user_ids, actor.id);
    let recipients = filter_by_preference(db, &candidates, category).await?;
    let text = render_text(category, &actor.name, &event.title);

    let mut notified = 0;
    for recipient_id in recipients {
        let view = create_notification(db, recipient_id, category, &text, &event, actor).await?;
        let payload = WsOutboundEvent::Notification(serde_json::to_value(&view)?);
        dispatcher.publish_to_user(recipient_id, &payload).await;
        notified += 1;
    }
    Ok(notified)
}

/// Run the fan-out as a detached best-effort task. The primary action has
/// already been committed and answered; failures here are only logged.
pub fn spawn(
    state: crate::state::AppState,
    event_id: Uuid,
    actor: UserRef,
    category: NotificationCategory,
) {
    tokio::spawn(async move {
        match fan_out(
            &state.db,
            state.realtime.as_ref(),
            event_id,
            &actor,
            category,
        )
        .await
        {
            Ok(notified) => {
                tracing::debug!(event_id = %event_id, notified, category = category.as_str(), "fan-out complete")
            }
            Err(e) => {
                tracing::warn!(error = %e, event_id = %event_id, category = category.as_str(), "notification fan-out failed")
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn recipients_are_creator_plus_rsvp_users_minus_actor() {
        let creator = Uuid::new_v4();
        let rsvped = ids(3);
        let actor = Uuid::new_v4();

        let got = resolve_recipients(creator, &rsvped, actor);

        let mut expected: HashSet<Uuid> = rsvped.iter().copied().collect();
        expected.insert(creator);
        assert_eq!(got, expected);
    }

    #[test]
    fn actor_never_receives_even_as_creator() {
        let creator = Uuid::new_v4();
        let rsvped = ids(2);

        let got = resolve_recipients(creator, &rsvped, creator);

        assert!(!got.contains(&creator));
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn actor_never_receives_even_with_an_rsvp() {
        let creator = Uuid::new_v4();
        let mut rsvped = ids(2);
        let actor = rsvped[0];
        rsvped.push(actor); // duplicate RSVP entry changes nothing

        let got = resolve_recipients(creator, &rsvped, actor);

        assert!(!got.contains(&actor));
        assert_eq!(got.len(), 2); // creator + the other RSVP user
    }

    #[test]
    fn creator_with_own_rsvp_is_counted_once() {
        let creator = Uuid::new_v4();
        let rsvped = vec![creator, Uuid::new_v4()];
        let actor = Uuid::new_v4();

        let got = resolve_recipients(creator, &rsvped, actor);
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn lonely_event_resolves_to_empty_set() {
        let creator = Uuid::new_v4();
        let got = resolve_recipients(creator, &[], creator);
        assert!(got.is_empty());
    }

    #[test]
    fn declined_and_pending_rsvps_still_count() {
        // The resolver works on user ids only; status never reaches it. An
        // event loader that filtered by status would break this contract, so
        // pin the expectation here.
        let creator = Uuid::new_v4();
        let declined_user = Uuid::new_v4();
        let got = resolve_recipients(creator, &[declined_user], Uuid::new_v4());
        assert!(got.contains(&declined_user));
    }

    #[test]
    fn crowded_event_notifies_everyone_but_the_actor() {
        // Creator + 3 RSVP'd users, actor among them: exactly 3 recipients.
        let creator = Uuid::new_v4();
        let rsvped = ids(3);
        let actor = rsvped[1];

        let got = resolve_recipients(creator, &rsvped, actor);
        assert_eq!(got.len(), 3);
        assert!(got.contains(&creator));
    }

    #[test]
    fn rendered_texts_name_the_actor_and_event() {
        assert_eq!(
            render_text(NotificationCategory::Message, "Alice", "Launch"),
            "Alice sent a message in \"Launch\""
        );
        assert_eq!(
            render_text(NotificationCategory::File, "Bob", "Picnic"),
            "Bob uploaded a file in \"Picnic\""
        );
        assert_eq!(
            render_text(NotificationCategory::Rsvp, "Carol", "Standup"),
            "Carol updated their RSVP for \"Standup\""
        );
    }
}
