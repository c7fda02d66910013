// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! A single-consumer event loop: one dedicated task drains a bounded mpsc
//! channel and feeds every event to an `EventAction` in order. This is the
//! actor substrate described in the design notes ("a single owner task that
//! consumes a queue of commands") -- the resource manager's actor loop (C8)
//! is one `EventLoop` whose `EventAction` dispatches on a command enum.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Result, RmError};

#[async_trait::async_trait]
pub trait EventAction<E>: Send + Sync {
    /// Called once before the first event is drained.
    fn on_start(&self) {}

    /// Called once after the loop has stopped draining events.
    fn on_stop(&self) {}

    async fn on_receive(&self, event: E) -> Result<()>;

    /// Called when `on_receive` returns an error. Returning `true` stops the
    /// loop; returning `false` logs and continues.
    fn on_error(&self, error: RmError) -> bool {
        tracing::error!(%error, "event loop action failed");
        false
    }
}

#[derive(Clone)]
pub struct EventSender<E> {
    name: String,
    tx: mpsc::Sender<E>,
    stopped: Arc<AtomicBool>,
}

impl<E: Send + 'static> EventSender<E> {
    pub async fn post_event(&self, event: E) -> Result<()> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(RmError::EventLoopStopped {
                name: self.name.clone(),
            });
        }
        self.tx
            .send(event)
            .await
            .map_err(|_| RmError::EventLoopClosed {
                name: self.name.clone(),
            })
    }
}

pub struct EventLoop<E: Send + 'static> {
    name: String,
    buffer_size: usize,
    stopped: Arc<AtomicBool>,
    action: Arc<dyn EventAction<E>>,
    tx: mpsc::Sender<E>,
    rx: Option<mpsc::Receiver<E>>,
    join_handle: Option<JoinHandle<()>>,
}

impl<E: Send + 'static> EventLoop<E> {
    pub fn new(name: String, buffer_size: usize, action: Arc<dyn EventAction<E>>) -> Self {
        let (tx, rx) = mpsc::channel(buffer_size);
        Self {
            name,
            buffer_size,
            stopped: Arc::new(AtomicBool::new(false)),
            action,
            tx,
            rx: Some(rx),
            join_handle: None,
        }
    }

    pub fn get_sender(&self) -> Result<EventSender<E>> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(RmError::EventLoopStopped {
                name: self.name.clone(),
            });
        }
        Ok(EventSender {
            name: self.name.clone(),
            tx: self.tx.clone(),
            stopped: self.stopped.clone(),
        })
    }

    /// Spawn the consumer task. Can only be called once; subsequent calls
    /// return an error (mirrors the "only call this function once" contract
    /// of its teacher).
    pub fn start(&mut self) -> Result<()> {
        let mut rx = self.rx.take().ok_or_else(|| {
            RmError::internal(format!("event loop '{}' already started", self.name))
        })?;
        let action = self.action.clone();
        let stopped = self.stopped.clone();
        let name = self.name.clone();

        let handle = tokio::task::spawn(async move {
            action.on_start();
            while let Some(event) = rx.recv().await {
                if let Err(e) = action.on_receive(event).await {
                    if action.on_error(e) {
                        break;
                    }
                }
            }
            stopped.store(true, Ordering::Release);
            action.on_stop();
            tracing::info!(name, "event loop stopped");
        });
        self.join_handle = Some(handle);
        Ok(())
    }

    pub fn stop(&mut self) {
        self.stopped.store(true, Ordering::Release);
        if let Some(handle) = self.join_handle.take() {
            handle.abort();
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Collector(Mutex<Vec<u32>>);

    #[async_trait::async_trait]
    impl EventAction<u32> for Collector {
        async fn on_receive(&self, event: u32) -> Result<()> {
            self.0.lock().unwrap().push(event);
            Ok(())
        }
    }

    #[tokio::test]
    async fn events_are_delivered_in_order() {
        let collector = Arc::new(Collector(Mutex::new(vec![])));
        let mut event_loop = EventLoop::new("test".to_owned(), 16, collector.clone());
        event_loop.start().unwrap();

        let sender = event_loop.get_sender().unwrap();
        for i in 0..10 {
            sender.post_event(i).await.unwrap();
        }

        // give the consumer task a chance to drain
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(collector.0.lock().unwrap().as_slice(), &(0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn posting_after_stop_is_an_error() {
        let collector = Arc::new(Collector(Mutex::new(vec![])));
        let mut event_loop = EventLoop::new("test".to_owned(), 16, collector);
        event_loop.start().unwrap();
        event_loop.stop();

        let sender = event_loop.get_sender();
        assert!(sender.is_err());
    }
}
