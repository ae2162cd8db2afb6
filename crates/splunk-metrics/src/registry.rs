//! Request-scoped and process-wide metric registries.

use once_cell::sync::Lazy;
use prometheus_client::{
    encoding::text,
    registry::{Metric, Registry as RegistryInner},
};

use std::{
    any::{self, Any},
    collections::{HashMap, HashSet},
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

use crate::{
    collector::{Collect, CollectorAdapter},
    format::{Format, PrometheusWrapper},
};

/// Errors that can occur when registering metrics.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RegistrationError {
    /// Metric with the same name is already registered with another type.
    #[error("metric `{name}` is already registered as `{existing}`, cannot register it as `{requested}`")]
    TypeMismatch {
        /// Metric name.
        name: &'static str,
        /// Type of the registered metric.
        existing: &'static str,
        /// Type requested by the caller.
        requested: &'static str,
    },
    /// Metric with the same name is already registered in a request-scoped [`Registry`].
    #[error("metric `{name}` is already registered")]
    Duplicate {
        /// Metric name.
        name: &'static str,
    },
}

fn encode_inner<W: fmt::Write>(
    inner: &RegistryInner,
    writer: &mut W,
    format: Format,
) -> fmt::Result {
    match format {
        Format::OpenMetrics => text::encode(writer, inner),
        Format::Prometheus => {
            let mut wrapper = PrometheusWrapper::new(writer);
            text::encode(&mut wrapper, inner)?;
            wrapper.flush()
        }
    }
}

/// Short-lived metrics registry, e.g. one created for a single scrape request.
#[derive(Debug)]
pub struct Registry {
    inner: RegistryInner,
    names: HashSet<&'static str>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn empty() -> Self {
        Self {
            inner: RegistryInner::default(),
            names: HashSet::new(),
        }
    }

    /// Registers a collector. All metric names [described](Collect::describe()) by the collector
    /// are claimed in this registry.
    ///
    /// # Errors
    ///
    /// Returns an error if any described name is already registered. In this case,
    /// the registry is not modified.
    pub fn register_collector<C: Collect>(&mut self, collector: C) -> Result<(), RegistrationError> {
        let names: Vec<_> = collector.describe().map(|descriptor| descriptor.name).collect();
        let mut seen = HashSet::with_capacity(names.len());
        for &name in &names {
            if self.names.contains(name) || !seen.insert(name) {
                return Err(RegistrationError::Duplicate { name });
            }
        }

        self.names.extend(names);
        self.inner
            .register_collector(Box::new(CollectorAdapter(collector)));
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn register_metric(
        &mut self,
        name: &'static str,
        help: &'static str,
        metric: impl Metric,
    ) -> Result<(), RegistrationError> {
        if !self.names.insert(name) {
            return Err(RegistrationError::Duplicate { name });
        }
        self.inner.register(name, help, metric);
        Ok(())
    }

    /// Encodes all metrics in this registry using the specified exposition format.
    ///
    /// # Errors
    ///
    /// Proxies formatting errors of the provided `writer`.
    pub fn encode<W: fmt::Write>(&self, writer: &mut W, format: Format) -> fmt::Result {
        encode_inner(&self.inner, writer, format)
    }
}

struct Registration {
    type_name: &'static str,
    handle: Box<dyn Any + Send + Sync>,
}

#[derive(Default)]
struct GlobalRegistryInner {
    registry: RegistryInner,
    registrations: HashMap<&'static str, Registration>,
}

/// Process-wide metrics registry with idempotent, name-keyed registration.
///
/// Metrics are registered with [`Self::get_or_register()`]; repeated registrations under the same
/// name return handles to the same underlying metric.
#[derive(Default)]
pub struct GlobalRegistry {
    inner: RwLock<GlobalRegistryInner>,
}

impl fmt::Debug for GlobalRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<_> = inner.registrations.keys().copied().collect();
        names.sort_unstable();
        formatter
            .debug_struct("GlobalRegistry")
            .field("names", &names)
            .finish_non_exhaustive()
    }
}

impl GlobalRegistry {
    /// Returns the registry shared by the entire process.
    pub fn global() -> &'static Arc<Self> {
        static GLOBAL: Lazy<Arc<GlobalRegistry>> = Lazy::new(Arc::default);
        &GLOBAL
    }

    /// Returns the metric registered under `name`, or creates it with `constructor` and registers it.
    /// The lookup and insertion are performed atomically, so concurrent callers get handles
    /// to a single metric.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric with the same name but of a different type is registered.
    pub fn get_or_register<M, F>(
        &self,
        name: &'static str,
        help: &'static str,
        constructor: F,
    ) -> Result<M, RegistrationError>
    where
        M: Metric + Clone + Send + Sync,
        F: FnOnce() -> M,
    {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(registration) = inner.registrations.get(name) {
            return registration
                .handle
                .downcast_ref::<M>()
                .cloned()
                .ok_or(RegistrationError::TypeMismatch {
                    name,
                    existing: registration.type_name,
                    requested: any::type_name::<M>(),
                });
        }

        let metric = constructor();
        inner.registry.register(name, help, metric.clone());
        inner.registrations.insert(
            name,
            Registration {
                type_name: any::type_name::<M>(),
                handle: Box::new(metric.clone()),
            },
        );
        Ok(metric)
    }

    /// Encodes all metrics in this registry using the specified exposition format.
    ///
    /// # Errors
    ///
    /// Proxies formatting errors of the provided `writer`.
    pub fn encode<W: fmt::Write>(&self, writer: &mut W, format: Format) -> fmt::Result {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        encode_inner(&inner.registry, writer, format)
    }
}
