//! 事件源缓存
//!
//! 按角色模型组合缓存事件源：首次使用时构建，之后复用；缓存是进程内唯一的共享可变状态。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::{EventSource, HttpSource, RoleModels, ScriptedSource};
use crate::config::OrchestratorSection;
use crate::core::RunError;

/// 根据角色模型构建事件源
pub type SourceFactory =
    Arc<dyn Fn(&RoleModels) -> Result<Arc<dyn EventSource>, RunError> + Send + Sync>;

pub struct SourceRegistry {
    factory: SourceFactory,
    cache: RwLock<HashMap<RoleModels, Arc<dyn EventSource>>>,
}

impl SourceRegistry {
    pub fn new(factory: SourceFactory) -> Self {
        Self {
            factory,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// 所有模型组合共用同一个事件源
    pub fn shared(source: Arc<dyn EventSource>) -> Self {
        Self::new(Arc::new(move |_: &RoleModels| -> Result<Arc<dyn EventSource>, RunError> {
            Ok(Arc::clone(&source))
        }))
    }

    /// 配置了 base_url 时连接 sidecar，否则回放演示脚本
    pub fn from_config(settings: &OrchestratorSection) -> Self {
        match settings.base_url.clone().filter(|u| !u.trim().is_empty()) {
            Some(base_url) => {
                tracing::info!("Event source: orchestrator sidecar at {}", base_url);
                let settings = settings.clone();
                Self::new(Arc::new(move |_: &RoleModels| -> Result<Arc<dyn EventSource>, RunError> {
                    let source = HttpSource::new(base_url.clone(), &settings)?;
                    Ok(Arc::new(source))
                }))
            }
            None => {
                tracing::warn!("orchestrator.base_url not set, replaying the built-in demo run");
                Self::new(Arc::new(|_: &RoleModels| -> Result<Arc<dyn EventSource>, RunError> {
                    Ok(Arc::new(ScriptedSource::demo()))
                }))
            }
        }
    }

    /// 取缓存的事件源，不存在则构建一次
    pub async fn get_or_create(&self, models: &RoleModels) -> Result<Arc<dyn EventSource>, RunError> {
        if let Some(source) = self.cache.read().await.get(models) {
            return Ok(Arc::clone(source));
        }

        let mut cache = self.cache.write().await;
        if let Some(source) = cache.get(models) {
            return Ok(Arc::clone(source));
        }
        let source = (self.factory)(models)?;
        tracing::info!(
            "Built {} event source for models researcher={} coder={} manager={} reviewer={}",
            source.name(),
            models.researcher,
            models.coder,
            models.manager,
            models.reviewer
        );
        cache.insert(models.clone(), Arc::clone(&source));
        Ok(source)
    }

    /// 已缓存的事件源数量
    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_registry(built: Arc<AtomicUsize>) -> SourceRegistry {
        SourceRegistry::new(Arc::new(move |_: &RoleModels| -> Result<Arc<dyn EventSource>, RunError> {
            built.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(ScriptedSource::new(Vec::new())))
        }))
    }

    #[tokio::test]
    async fn test_builds_once_per_model_set() {
        let built = Arc::new(AtomicUsize::new(0));
        let registry = counting_registry(built.clone());

        let a = RoleModels {
            coder: "gpt-4o".into(),
            ..Default::default()
        };
        let b = RoleModels {
            coder: "gpt-4o-mini".into(),
            ..Default::default()
        };
        registry.get_or_create(&a).await.unwrap();
        registry.get_or_create(&a).await.unwrap();
        registry.get_or_create(&b).await.unwrap();

        assert_eq!(built.load(Ordering::SeqCst), 2);
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_factory_error_not_cached() {
        let registry = SourceRegistry::new(Arc::new(|_: &RoleModels| -> Result<Arc<dyn EventSource>, RunError> {
            Err(RunError::Config("missing endpoint".into()))
        }));
        assert!(registry.get_or_create(&RoleModels::default()).await.is_err());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_demo_when_no_base_url() {
        let registry = SourceRegistry::from_config(&OrchestratorSection::default());
        let source = registry.get_or_create(&RoleModels::default()).await.unwrap();
        assert_eq!(source.name(), "scripted");
    }
}
