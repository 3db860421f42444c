use crate::location::{GeocodeProvider, LocationResolver, NominatimProvider};
use tokio::sync::Semaphore;

pub struct AppState<P = NominatimProvider> {
    pub resolver: LocationResolver<P>,
    /// Bounds how many resolutions may talk to the provider at once.
    pub permits: Semaphore,
}

impl<P: GeocodeProvider> AppState<P> {
    pub fn new(resolver: LocationResolver<P>) -> Self {
        let permits = Semaphore::new(resolver.config().max_concurrent_resolutions.max(1));
        Self { resolver, permits }
    }
}
