use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::error::{ServiceError, ServiceResult};
use crate::model::generator::{GenerationOptions, ModelHandle, ModelLoader};

/// Owns the active [`ModelHandle`] and swaps it on restart.
///
/// Generations hold a read guard for their whole duration. A restart loads the new handle
/// without holding the lock, then takes the write lock, which waits for in-flight generations
/// to drain and holds back new ones until the swap is done. Restarts are serialized, so at
/// most one extra copy of the weights is in memory at a time.
pub struct ModelSlot {
    loader: Arc<dyn ModelLoader>,
    current: Arc<RwLock<Arc<ModelHandle>>>,
    restart_gate: Mutex<()>,
}

impl ModelSlot {
    #[tracing::instrument(level = "info", skip(loader))]
    pub async fn initialize(loader: Arc<dyn ModelLoader>) -> ServiceResult<Self> {
        let handle = load_blocking(loader.clone()).await?;
        info!(model = %handle.name, "model loaded");
        Ok(Self {
            loader,
            current: Arc::new(RwLock::new(Arc::new(handle))),
            restart_gate: Mutex::new(()),
        })
    }

    pub async fn model_name(&self) -> String {
        self.current.read().await.name.clone()
    }

    #[tracing::instrument(level = "info", skip(self, prompt))]
    pub async fn generate(
        &self,
        prompt: String,
        options: GenerationOptions,
    ) -> ServiceResult<String> {
        let guard = self.current.clone().read_owned().await;
        tokio::task::spawn_blocking(move || guard.generate(&prompt, &options))
            .await
            .map_err(|e| ServiceError::Generation(e.to_string()))?
            .map_err(|e| ServiceError::Generation(format!("{e:#}")))
    }

    /// Reconstructs the model through the loader and installs it. On failure the
    /// previous handle stays active.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn restart(&self) -> ServiceResult<String> {
        let _gate = self.restart_gate.lock().await;
        let handle = Arc::new(load_blocking(self.loader.clone()).await?);
        let name = handle.name.clone();
        let mut current = self.current.write().await;
        *current = handle;
        info!(model = %name, "model handle replaced");
        Ok(name)
    }
}

async fn load_blocking(loader: Arc<dyn ModelLoader>) -> ServiceResult<ModelHandle> {
    tokio::task::spawn_blocking(move || loader.load())
        .await
        .map_err(|e| ServiceError::ModelLoad(e.to_string()))?
        .map_err(|e| ServiceError::ModelLoad(format!("{e:#}")))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use anyhow::{bail, Result};

    use super::*;
    use crate::model::generator::TextGenerator;

    struct Tagged(usize);

    impl TextGenerator for Tagged {
        fn generate(&self, _prompt: &str, _options: &GenerationOptions) -> Result<String> {
            std::thread::sleep(Duration::from_millis(50));
            Ok(format!("generation {}", self.0))
        }
    }

    #[derive(Default)]
    struct CountingLoader {
        loads: AtomicUsize,
        fail_next: Mutex<bool>,
    }

    impl ModelLoader for CountingLoader {
        fn load(&self) -> Result<ModelHandle> {
            if std::mem::take(&mut *self.fail_next.lock().unwrap()) {
                bail!("weights file missing");
            }
            let n = self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(ModelHandle::new("tagged", Tagged(n)))
        }
    }

    #[tokio::test]
    async fn restart_installs_a_new_handle() {
        let loader = Arc::new(CountingLoader::default());
        let slot = ModelSlot::initialize(loader.clone()).await.unwrap();
        let first = slot
            .generate("hi".into(), GenerationOptions::PROMPT_V1)
            .await
            .unwrap();
        assert_eq!(first, "generation 0");

        slot.restart().await.unwrap();
        let second = slot
            .generate("hi".into(), GenerationOptions::PROMPT_V1)
            .await
            .unwrap();
        assert_eq!(second, "generation 1");
        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_restart_keeps_previous_handle() {
        let loader = Arc::new(CountingLoader::default());
        let slot = ModelSlot::initialize(loader.clone()).await.unwrap();
        *loader.fail_next.lock().unwrap() = true;

        let err = slot.restart().await.unwrap_err();
        assert!(matches!(err, ServiceError::ModelLoad(ref m) if m.contains("weights file missing")));
        let out = slot
            .generate("hi".into(), GenerationOptions::PROMPT_V2)
            .await
            .unwrap();
        assert_eq!(out, "generation 0");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn restart_waits_for_in_flight_generation() {
        let loader = Arc::new(CountingLoader::default());
        let slot = Arc::new(ModelSlot::initialize(loader).await.unwrap());

        let in_flight = {
            let slot = slot.clone();
            tokio::spawn(async move {
                slot.generate("hi".into(), GenerationOptions::PROMPT_V1)
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        slot.restart().await.unwrap();

        // the generation that started before the swap finished on the old handle
        assert_eq!(in_flight.await.unwrap().unwrap(), "generation 0");
    }

    #[derive(Default)]
    struct SlowLoader {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ModelLoader for SlowLoader {
        fn load(&self) -> Result<ModelHandle> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(30));
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(ModelHandle::new("slow", Tagged(0)))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_restarts_load_one_at_a_time() {
        let loader = Arc::new(SlowLoader::default());
        let slot = ModelSlot::initialize(loader.clone()).await.unwrap();

        let (a, b, c) = tokio::join!(slot.restart(), slot.restart(), slot.restart());
        for name in [a, b, c] {
            assert_eq!(name.unwrap(), "slow");
        }
        assert_eq!(loader.peak.load(Ordering::SeqCst), 1);
    }
}
