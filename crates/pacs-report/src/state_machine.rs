//! 影像状态机
//!
//! 管理单张影像从上传到分析完成的生命周期状态转换

use pacs_core::{ImageStatus, PacsError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 影像状态转换事件
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ImageEvent {
    UploadFinished,
    AnalysisCompleted,
    Failed,
}

/// 影像状态机
#[derive(Debug)]
pub struct ImageStateMachine {
    transitions: HashMap<(ImageStatus, ImageEvent), ImageStatus>,
}

impl ImageStateMachine {
    /// 创建新的状态机实例
    pub fn new() -> Self {
        let mut transitions = HashMap::new();

        transitions.insert(
            (ImageStatus::Uploading, ImageEvent::UploadFinished),
            ImageStatus::Processing,
        );
        transitions.insert(
            (ImageStatus::Processing, ImageEvent::AnalysisCompleted),
            ImageStatus::Completed,
        );
        transitions.insert((ImageStatus::Uploading, ImageEvent::Failed), ImageStatus::Error);
        transitions.insert((ImageStatus::Processing, ImageEvent::Failed), ImageStatus::Error);

        Self { transitions }
    }

    /// 检查状态转换是否有效
    pub fn can_transition(&self, from: ImageStatus, event: ImageEvent) -> bool {
        self.transitions.contains_key(&(from, event))
    }

    /// 执行状态转换
    pub fn transition(&self, from: ImageStatus, event: ImageEvent) -> Result<ImageStatus> {
        match self.transitions.get(&(from, event)) {
            Some(to) => Ok(*to),
            None => Err(PacsError::InvalidStateTransition {
                from: format!("{:?}", from),
                event: format!("{:?}", event),
            }),
        }
    }

    /// 终止状态没有任何出边
    pub fn is_terminal(&self, state: ImageStatus) -> bool {
        !self.transitions.keys().any(|(from, _)| *from == state)
    }

    /// 获取状态的所有可能事件
    pub fn get_possible_events(&self, current_state: ImageStatus) -> Vec<ImageEvent> {
        self.transitions
            .keys()
            .filter(|(state, _)| *state == current_state)
            .map(|(_, event)| *event)
            .collect()
    }
}

impl Default for ImageStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        let sm = ImageStateMachine::new();

        assert!(sm.can_transition(ImageStatus::Uploading, ImageEvent::UploadFinished));
        assert!(sm.can_transition(ImageStatus::Processing, ImageEvent::AnalysisCompleted));
        assert!(sm.can_transition(ImageStatus::Uploading, ImageEvent::Failed));
        assert!(sm.can_transition(ImageStatus::Processing, ImageEvent::Failed));
    }

    #[test]
    fn test_terminal_states() {
        let sm = ImageStateMachine::new();

        assert!(sm.is_terminal(ImageStatus::Completed));
        assert!(sm.is_terminal(ImageStatus::Error));
        assert!(!sm.is_terminal(ImageStatus::Processing));
        assert!(!sm.can_transition(ImageStatus::Completed, ImageEvent::Failed));
        assert!(!sm.can_transition(ImageStatus::Error, ImageEvent::AnalysisCompleted));
        assert!(sm.get_possible_events(ImageStatus::Completed).is_empty());

        for state in [
            ImageStatus::Uploading,
            ImageStatus::Processing,
            ImageStatus::Completed,
            ImageStatus::Error,
        ] {
            assert_eq!(sm.is_terminal(state), state.is_terminal());
        }
    }

    #[test]
    fn test_state_execution() {
        let sm = ImageStateMachine::new();

        let result = sm.transition(ImageStatus::Uploading, ImageEvent::UploadFinished);
        assert_eq!(result.unwrap(), ImageStatus::Processing);

        let result = sm.transition(ImageStatus::Uploading, ImageEvent::AnalysisCompleted);
        assert!(matches!(result, Err(PacsError::InvalidStateTransition { .. })));
    }
}
