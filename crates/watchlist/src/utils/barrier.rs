use tokio::sync::watch;

/// 一次性的初始化屏障
///
/// 初始为未就绪状态，首次全量加载完成后由 [`InitBarrier::signal`] 置为就绪，之后不会再回到未就绪。
/// 所有修改操作在执行前都需要等待它，避免基于空的初始状态计算新数据。
/// 等待没有超时，也不能取消：如果初始加载始终没有完成，等待者会一直挂起。
#[derive(Debug)]
pub struct InitBarrier {
    tx: watch::Sender<bool>,
}

impl Default for InitBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl InitBarrier {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// 置为就绪并唤醒所有等待者，只有第一次调用返回 true
    pub fn signal(&self) -> bool {
        self.tx.send_if_modified(|ready| {
            if *ready {
                false
            } else {
                *ready = true;
                true
            }
        })
    }

    pub fn is_signaled(&self) -> bool {
        *self.tx.borrow()
    }

    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // 发送端与屏障同生命周期，这里不会返回错误
        let _ = rx.wait_for(|ready| *ready).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_wait_blocks_until_signaled() {
        let barrier = Arc::new(InitBarrier::new());
        assert!(!barrier.is_signaled());

        let waiters = (0..3)
            .map(|_| {
                let barrier = barrier.clone();
                tokio::spawn(async move { barrier.wait().await })
            })
            .collect::<Vec<_>>();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(waiters.iter().all(|w| !w.is_finished()));

        assert!(barrier.signal());
        for waiter in waiters {
            tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
        }
    }

    #[tokio::test]
    async fn test_signal_only_once() {
        let barrier = InitBarrier::new();
        assert!(barrier.signal());
        assert!(!barrier.signal());
        assert!(barrier.is_signaled());
        // 就绪后等待立即返回
        tokio::time::timeout(Duration::from_millis(100), barrier.wait()).await.unwrap();
    }
}
