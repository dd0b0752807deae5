use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money, ResultEngine, Transaction, accounts, next_recurring_date, transactions,
    util::parse_uuid,
};

use super::{Engine, retry_on_conflict, with_tx};

/// Upper bound of occurrences booked for one template in a single run, so a
/// long-dormant daily template cannot produce an unbounded unit of work.
const MAX_OCCURRENCES_PER_RUN: usize = 366;

/// Outcome of [`Engine::process_due_recurring`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringRun {
    /// Templates that had at least one due occurrence.
    pub templates: usize,
    /// Ids of the occurrences that were booked.
    pub created: Vec<Uuid>,
    /// Templates whose unit of work failed and was rolled back.
    pub failed: Vec<Uuid>,
}

impl Engine {
    /// Books every due occurrence of the user's recurring transactions.
    ///
    /// Each occurrence is a plain (non-recurring) copy of its template dated
    /// at the scheduled date; its contribution is applied to the account and
    /// the template's schedule moves past `now`. Each template is processed
    /// in its own DB transaction; a template that fails is rolled back,
    /// logged and reported in [`RecurringRun::failed`] while the remaining
    /// templates are still processed.
    pub async fn process_due_recurring(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<RecurringRun> {
        let due = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id.to_string()))
            .filter(transactions::Column::IsRecurring.eq(true))
            .filter(transactions::Column::NextRecurringDate.lte(now))
            .order_by_asc(transactions::Column::NextRecurringDate)
            .all(&self.database)
            .await?;

        let mut run = RecurringRun::default();
        for model in due {
            let template_id = match parse_uuid(&model.id, "transaction") {
                Ok(id) => id,
                Err(err) => {
                    tracing::error!(id = %model.id, error = %err, "skipping recurring template");
                    continue;
                }
            };
            let created = match retry_on_conflict!(
                "process_due_recurring",
                self.try_process_template(template_id, now)
            ) {
                Ok(created) => created,
                Err(err) => {
                    tracing::error!(%template_id, error = %err, "recurring template failed");
                    run.failed.push(template_id);
                    continue;
                }
            };
            if !created.is_empty() {
                tracing::debug!(%template_id, occurrences = created.len(), "booked recurring occurrences");
                run.templates += 1;
                run.created.extend(created);
            }
        }
        Ok(run)
    }

    async fn try_process_template(
        &self,
        template_id: Uuid,
        now: DateTime<Utc>,
    ) -> ResultEngine<Vec<Uuid>> {
        with_tx!(self, |db_tx| {
            let Some(model) = transactions::Entity::find_by_id(template_id.to_string())
                .one(&db_tx)
                .await?
            else {
                return Ok(Vec::new());
            };
            let template = Transaction::try_from(model)?;
            let (true, Some(interval), Some(mut due)) = (
                template.is_recurring,
                template.recurring_interval,
                template.next_recurring_date,
            ) else {
                return Ok(Vec::new());
            };

            let account = accounts::Entity::find_by_id(template.account_id.to_string())
                .filter(accounts::Column::UserId.eq(template.user_id.clone()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("Account".to_string()))?;

            let mut created = Vec::new();
            let mut total = Money::ZERO;
            while due <= now && created.len() < MAX_OCCURRENCES_PER_RUN {
                let occurrence = Transaction {
                    id: Uuid::new_v4(),
                    occurred_at: due,
                    is_recurring: false,
                    recurring_interval: None,
                    next_recurring_date: None,
                    last_processed_at: None,
                    created_at: now,
                    updated_at: now,
                    ..template.clone()
                };
                transactions::ActiveModel::from(&occurrence)
                    .insert(&db_tx)
                    .await?;
                total += occurrence.signed_amount();
                created.push(occurrence.id);

                due = next_recurring_date(due, interval).ok_or_else(|| {
                    EngineError::Validation("next recurring date is out of range".to_string())
                })?;
            }

            if created.is_empty() {
                return Ok(created);
            }

            self.apply_balance_delta(&db_tx, &account, total).await?;

            let template_update = transactions::ActiveModel {
                id: ActiveValue::Set(template.id.to_string()),
                next_recurring_date: ActiveValue::Set(Some(due)),
                last_processed_at: ActiveValue::Set(Some(now)),
                updated_at: ActiveValue::Set(now),
                ..Default::default()
            };
            template_update.update(&db_tx).await?;

            Ok(created)
        })
    }
}
