/// The notification collaborator. The host decides how the cue manifests
/// (audible, system notification, haptics); the engine only calls this,
/// exactly once per session, and never inspects the result.
pub trait Notifier: Send + Sync {
    fn alert_approaching(&self, destination_name: &str);
}

/// Notifier that reports through tracing. Stands in for the host-side
/// sound/notification/vibration dispatcher in the demo binary.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn alert_approaching(&self, destination_name: &str) {
        tracing::info!("Destination alert! Approaching {destination_name}, prepare to get off");
    }
}
