use log::info;

/// Receives the named scalars reported at the end of every step.
pub trait MetricSink {
    fn log_scalar(&mut self, name: &str, value: f32);
}

impl<T: MetricSink + ?Sized> MetricSink for Box<T> {
    fn log_scalar(&mut self, name: &str, value: f32) {
        (**self).log_scalar(name, value);
    }
}

impl<T: MetricSink + ?Sized> MetricSink for &mut T {
    fn log_scalar(&mut self, name: &str, value: f32) {
        (**self).log_scalar(name, value);
    }
}

/// Forwards every scalar to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl MetricSink for LogSink {
    fn log_scalar(&mut self, name: &str, value: f32) {
        info!(metric = name, value = value; "scalar");
    }
}

/// Keeps every scalar in memory, in the order it was reported.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    records: Vec<(String, f32)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[(String, f32)] {
        &self.records
    }

    /// Returns the last value reported under `name`.
    pub fn last(&self, name: &str) -> Option<f32> {
        self.records
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|&(_, v)| v)
    }

    /// Returns every value reported under `name`.
    pub fn values(&self, name: &str) -> Vec<f32> {
        self.records
            .iter()
            .filter(|(n, _)| n == name)
            .map(|&(_, v)| v)
            .collect()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl MetricSink for RecordingSink {
    fn log_scalar(&mut self, name: &str, value: f32) {
        self.records.push((name.to_string(), value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_keeps_order() {
        let mut sink = RecordingSink::new();
        sink.log_scalar("train_loss_step", 0.7);
        sink.log_scalar("train_acc_step", 0.5);
        sink.log_scalar("train_loss_step", 0.6);

        assert_eq!(sink.records().len(), 3);
        assert_eq!(sink.last("train_loss_step"), Some(0.6));
        assert_eq!(sink.values("train_loss_step"), vec![0.7, 0.6]);
        assert_eq!(sink.last("val_loss_step"), None);
    }

    #[test]
    fn boxed_sinks_forward() {
        let mut sink: Box<dyn MetricSink> = Box::new(LogSink);
        sink.log_scalar("test_auc_step", 0.9);
    }
}
