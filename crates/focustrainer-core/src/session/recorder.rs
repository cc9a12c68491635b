use super::{HistoryRecord, Reflection, SessionReport};
use crate::timer::Phase;

/// Turns finished or abandoned focus phases into history records.
///
/// Implementations swallow their own storage failures: the engine's tick loop
/// must never stall on the recorder.
pub trait SessionRecorder {
    /// Persist a record for `report` and return its id.
    ///
    /// Only focus phases produce records; break reports return `None`.
    fn record(&mut self, report: &SessionReport) -> Option<String>;

    /// Attach `reflection` to record `id`.
    ///
    /// Returns `false` without changing anything when the id is unknown or a
    /// reflection is already attached.
    fn attach_reflection(&mut self, id: &str, reflection: Reflection) -> bool;

    /// Most recent records first.
    fn list(&self, limit: usize) -> Vec<HistoryRecord>;

    fn get(&self, id: &str) -> Option<HistoryRecord>;
}

/// In-process recorder, used by tests and embedders without a database.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    records: Vec<HistoryRecord>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }
}

impl SessionRecorder for MemoryRecorder {
    fn record(&mut self, report: &SessionReport) -> Option<String> {
        if report.phase != Phase::Focus {
            return None;
        }
        let record = HistoryRecord::from_report(report);
        let id = record.id.clone();
        self.records.push(record);
        Some(id)
    }

    fn attach_reflection(&mut self, id: &str, reflection: Reflection) -> bool {
        match self
            .records
            .iter_mut()
            .find(|r| r.id == id && r.reflection.is_none())
        {
            Some(record) => {
                record.reflection = Some(reflection);
                true
            }
            None => false,
        }
    }

    fn list(&self, limit: usize) -> Vec<HistoryRecord> {
        self.records.iter().rev().take(limit).cloned().collect()
    }

    fn get(&self, id: &str) -> Option<HistoryRecord> {
        self.records.iter().find(|r| r.id == id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::report;
    use crate::session::ReflectionQuality;

    fn reflection(note: &str) -> Reflection {
        Reflection {
            quality: ReflectionQuality::Great,
            biggest_distraction: None,
            note: note.into(),
        }
    }

    #[test]
    fn break_reports_are_not_recorded() {
        let mut recorder = MemoryRecorder::new();
        assert!(recorder.record(&report(Phase::ShortBreak, true)).is_none());
        assert!(recorder.records().is_empty());
    }

    #[test]
    fn reflection_attaches_exactly_once() {
        let mut recorder = MemoryRecorder::new();
        let id = recorder.record(&report(Phase::Focus, true)).unwrap();

        assert!(recorder.attach_reflection(&id, reflection("first")));
        assert!(!recorder.attach_reflection(&id, reflection("second")));
        assert_eq!(
            recorder.get(&id).unwrap().reflection.unwrap().note,
            "first"
        );
    }

    #[test]
    fn unknown_id_is_a_silent_no_op() {
        let mut recorder = MemoryRecorder::new();
        recorder.record(&report(Phase::Focus, false));
        assert!(!recorder.attach_reflection("missing", reflection("x")));
        assert!(recorder.records()[0].reflection.is_none());
    }

    #[test]
    fn list_is_newest_first() {
        let mut recorder = MemoryRecorder::new();
        let first = recorder.record(&report(Phase::Focus, true)).unwrap();
        let second = recorder.record(&report(Phase::Focus, false)).unwrap();
        let listed: Vec<String> = recorder.list(10).into_iter().map(|r| r.id).collect();
        assert_eq!(listed, vec![second, first]);
        assert_eq!(recorder.list(1).len(), 1);
    }
}
