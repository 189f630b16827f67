//! 保留最新值的广播
//!
//! 新订阅者会立即收到当前值，之后按发布顺序收到每一次更新。
//! 与 `tokio::sync::watch` 不同，这里不会合并中间值：每个订阅者都拥有独立的无界队列。

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_stream::Stream;
use tracing::trace;
use uuid::Uuid;
use watchlist_entity::entities::source;

struct Shared<T> {
    latest: T,
    subscribers: HashMap<Uuid, UnboundedSender<T>>,
}

pub struct Broadcaster<T> {
    // 最新值与订阅者登记放在同一把锁下，保证订阅与发布之间不丢失、不重复
    shared: Arc<Mutex<Shared<T>>>,
}

impl<T: Clone> Broadcaster<T> {
    pub fn new(initial: T) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                latest: initial,
                subscribers: HashMap::new(),
            })),
        }
    }

    pub fn latest(&self) -> T {
        self.shared.lock().latest.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.lock().subscribers.len()
    }

    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        let mut shared = self.shared.lock();
        // 接收端此时必然存在，发送不会失败
        let _ = tx.send(shared.latest.clone());
        shared.subscribers.insert(id, tx);
        Subscription {
            id,
            rx,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// 保存新值并推送给所有订阅者，已关闭的订阅者会被移除
    pub fn publish(&self, value: T) {
        let mut shared = self.shared.lock();
        shared.subscribers.retain(|id, tx| {
            let alive = tx.send(value.clone()).is_ok();
            if !alive {
                trace!("移除已关闭的订阅者 {}", id);
            }
            alive
        });
        shared.latest = value;
    }
}

/// 单个订阅，丢弃时自动取消订阅
pub struct Subscription<T> {
    id: Uuid,
    rx: UnboundedReceiver<T>,
    shared: Weak<Mutex<Shared<T>>>,
}

impl<T> Subscription<T> {
    /// 等待下一个值，广播器被丢弃且队列已空时返回 None
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// 取出已到达的下一个值，没有时返回 None
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    pub fn unsubscribe(self) {}

    fn detach(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.lock().subscribers.remove(&self.id);
        }
    }
}

/// 作为流使用时订阅保持有效，流被丢弃时取消订阅
impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.detach();
    }
}

pub type SourceList = Arc<Vec<source::Model>>;

/// 同一次发布得到的两个视图
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceSnapshot {
    pub all: SourceList,
    pub active: SourceList,
}

/// "全部视频源"与"启用的视频源"两个视图
pub struct SourceViews {
    // 两个视图在同一把锁下发布，读取到的组合一定来自同一次发布
    snapshot: Mutex<SourceSnapshot>,
    all: Broadcaster<SourceList>,
    active: Broadcaster<SourceList>,
}

impl Default for SourceViews {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceViews {
    pub fn new() -> Self {
        let snapshot = SourceSnapshot::default();
        Self {
            all: Broadcaster::new(snapshot.all.clone()),
            active: Broadcaster::new(snapshot.active.clone()),
            snapshot: Mutex::new(snapshot),
        }
    }

    /// 发布新的全部视频源，启用视图由其过滤得到，两者都按 order 升序
    pub fn publish(&self, mut sources: Vec<source::Model>) {
        sources.sort_by_key(|s| (s.order, s.id));
        let active = Arc::new(sources.iter().filter(|s| s.active).cloned().collect::<Vec<_>>());
        let all = Arc::new(sources);

        let mut snapshot = self.snapshot.lock();
        self.all.publish(all.clone());
        self.active.publish(active.clone());
        *snapshot = SourceSnapshot { all, active };
    }

    pub fn snapshot(&self) -> SourceSnapshot {
        self.snapshot.lock().clone()
    }

    pub fn all(&self) -> SourceList {
        self.snapshot.lock().all.clone()
    }

    pub fn active(&self) -> SourceList {
        self.snapshot.lock().active.clone()
    }

    pub fn subscribe_all(&self) -> Subscription<SourceList> {
        self.all.subscribe()
    }

    pub fn subscribe_active(&self) -> Subscription<SourceList> {
        self.active.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use tokio_stream::StreamExt;

    use super::*;

    fn model(id: i32, order: i32, active: bool) -> source::Model {
        source::Model {
            id,
            name: format!("source-{}", id),
            image: None,
            active,
            order,
        }
    }

    #[tokio::test]
    async fn test_subscriber_receives_latest_then_updates() {
        let broadcaster = Broadcaster::new(0);
        broadcaster.publish(1);

        let mut early = broadcaster.subscribe();
        broadcaster.publish(2);
        broadcaster.publish(3);
        let mut late = broadcaster.subscribe();

        assert_eq!(early.recv().await, Some(1));
        assert_eq!(early.recv().await, Some(2));
        assert_eq!(early.recv().await, Some(3));
        assert_eq!(early.try_recv(), None);

        assert_eq!(late.recv().await, Some(3));
        assert_eq!(late.try_recv(), None);
        assert_eq!(broadcaster.latest(), 3);
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let broadcaster = Broadcaster::new("a");
        let first = broadcaster.subscribe();
        let mut second = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 2);

        first.unsubscribe();
        assert_eq!(broadcaster.subscriber_count(), 1);

        broadcaster.publish("b");
        assert_eq!(second.recv().await, Some("a"));
        assert_eq!(second.recv().await, Some("b"));
        assert_eq!(broadcaster.latest(), "b");

        drop(second);
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscription_as_stream() {
        let broadcaster = Broadcaster::new(10);
        let mut stream = broadcaster.subscribe();
        broadcaster.publish(11);
        assert_eq!(stream.next().await, Some(10));
        assert_eq!(stream.next().await, Some(11));

        // 流读取过程中仍然能收到后续发布的值
        broadcaster.publish(12);
        assert_eq!(stream.next().await, Some(12));
        assert_eq!(broadcaster.subscriber_count(), 1);

        drop(stream);
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_stream_ends_when_broadcaster_dropped() {
        let broadcaster = Broadcaster::new(1);
        let stream = broadcaster.subscribe();
        broadcaster.publish(2);
        drop(broadcaster);
        assert_eq!(stream.collect::<Vec<_>>().await, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_views_filter_active_in_order() {
        let views = SourceViews::new();
        let mut all = views.subscribe_all();
        let mut active = views.subscribe_active();
        assert!(all.recv().await.unwrap().is_empty());
        assert!(active.recv().await.unwrap().is_empty());

        views.publish(vec![model(1, 2, true), model(2, 0, false), model(3, 1, true)]);

        let all = all.recv().await.unwrap();
        let active = active.recv().await.unwrap();
        assert_eq!(all.iter().map(|s| s.id).collect::<Vec<_>>(), vec![2, 3, 1]);
        assert_eq!(active.iter().map(|s| s.id).collect::<Vec<_>>(), vec![3, 1]);
        assert_eq!(views.active(), active);
    }

    #[test]
    fn test_snapshot_pairs_come_from_one_publish() {
        let views = Arc::new(SourceViews::new());
        let publisher = {
            let views = views.clone();
            std::thread::spawn(move || {
                for round in 0..500 {
                    let sources = (0..4).map(|id| model(id, id, (id + round) % 2 == 0)).collect();
                    views.publish(sources);
                }
            })
        };
        for _ in 0..500 {
            let snapshot = views.snapshot();
            let filtered = snapshot.all.iter().filter(|s| s.active).cloned().collect::<Vec<_>>();
            assert_eq!(snapshot.active.as_slice(), filtered.as_slice());
        }
        publisher.join().unwrap();

        let snapshot = views.snapshot();
        assert_eq!(snapshot.all, views.all());
        assert_eq!(snapshot.active, views.active());
    }
}
