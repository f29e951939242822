/// Which of the candidate's names another host contested during an attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeConflict {
    pub hostname: bool,
    pub service_name: bool,
}

impl ProbeConflict {
    pub fn has_none(&self) -> bool {
        !self.hostname && !self.service_name
    }

    pub fn has_any(&self) -> bool {
        self.hostname || self.service_name
    }
}
