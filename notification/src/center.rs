// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Notification center
//!
//! Accepts notification requests and owns their delivery. Requests with a sending delay stay
//! scheduled until the delay elapses and can be deleted before that.
//!

use crate::NotificationError;

use common::{
    notification::{NotificationRequest, NotificationRequestStatus},
    NotificationRequestId, TenantId,
};
use store::NotificationRequestStore;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;

use std::{sync::Arc, time::Duration};

#[async_trait]
pub trait NotificationCenter: Send + Sync + 'static {
    /// Stores and delivers (or schedules) a request.
    async fn process_notification_request(
        &self,
        tenant_id: TenantId,
        request: NotificationRequest,
        sender_id: Option<Uuid>,
    ) -> Result<NotificationRequest, NotificationError>;

    /// Cancels a request that has not been delivered yet and removes it.
    async fn delete_notification_request(
        &self,
        tenant_id: TenantId,
        request_id: NotificationRequestId,
    ) -> Result<(), NotificationError>;
}

/// [`NotificationCenter`] that records requests in a [`NotificationRequestStore`]. Delivery is
/// marking the request sent; the channels themselves live outside this crate.
///
/// A due request and its deletion are serialized on `delivery`, so a deleted request is never
/// stored again as sent.
pub struct DefaultNotificationCenter {
    store: Arc<dyn NotificationRequestStore>,
    scheduled: Arc<DashMap<NotificationRequestId, CancellationToken>>,
    delivery: Arc<Mutex<()>>,
    token: CancellationToken,
}

impl DefaultNotificationCenter {
    /// Scheduled requests are abandoned when `token` is cancelled.
    pub fn new(store: Arc<dyn NotificationRequestStore>, token: CancellationToken) -> Self {
        Self {
            store,
            scheduled: Arc::new(DashMap::new()),
            delivery: Arc::new(Mutex::new(())),
            token,
        }
    }

    /// Requests waiting for their sending delay.
    pub fn scheduled_count(&self) -> usize {
        self.scheduled.len()
    }

    fn schedule(&self, request: NotificationRequest, request_id: NotificationRequestId) {
        let delay = Duration::from_secs(request.sending_delay_in_sec() as u64);
        let job = self.token.child_token();
        self.scheduled.insert(request_id, job.clone());
        let scheduled = self.scheduled.clone();
        let delivery = self.delivery.clone();
        let store = self.store.clone();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = job.cancelled() => {
                    debug!("Scheduled notification request {} cancelled.", request_id);
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }
            let _delivery = delivery.lock().await;
            if scheduled.remove(&request_id).is_none() {
                debug!("Scheduled notification request {} was deleted.", request_id);
                return;
            }
            let sent = NotificationRequest {
                status: NotificationRequestStatus::Sent,
                ..request
            };
            match store.save_request(sent).await {
                Ok(sent) => info!(
                    "[{}] Sending notification request {} to {} targets.",
                    sent.tenant_id,
                    request_id,
                    sent.targets.len()
                ),
                Err(e) => error!(
                    "Failed to send scheduled notification request {}: {}",
                    request_id, e
                ),
            }
        });
    }
}

#[async_trait]
impl NotificationCenter for DefaultNotificationCenter {
    async fn process_notification_request(
        &self,
        tenant_id: TenantId,
        request: NotificationRequest,
        _sender_id: Option<Uuid>,
    ) -> Result<NotificationRequest, NotificationError> {
        let delay = request.sending_delay_in_sec();
        if delay > 0 {
            let request = self
                .store
                .save_request(NotificationRequest {
                    tenant_id,
                    status: NotificationRequestStatus::Scheduled,
                    ..request
                })
                .await?;
            if let Some(request_id) = request.id {
                debug!(
                    "[{}] Notification request {} scheduled in {} sec.",
                    tenant_id, request_id, delay
                );
                self.schedule(request.clone(), request_id);
            }
            return Ok(request);
        }

        let request = self
            .store
            .save_request(NotificationRequest {
                tenant_id,
                status: NotificationRequestStatus::Sent,
                ..request
            })
            .await?;
        info!(
            "[{}] Sending notification request {:?} to {} targets.",
            tenant_id,
            request.id,
            request.targets.len()
        );
        Ok(request)
    }

    async fn delete_notification_request(
        &self,
        tenant_id: TenantId,
        request_id: NotificationRequestId,
    ) -> Result<(), NotificationError> {
        let _delivery = self.delivery.lock().await;
        if let Some((_, job)) = self.scheduled.remove(&request_id) {
            job.cancel();
        }
        self.store.delete_request(tenant_id, request_id).await?;
        debug!("[{}] Notification request {} deleted.", tenant_id, request_id);
        Ok(())
    }
}
