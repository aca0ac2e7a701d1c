//! 批次完成判定
//!
//! 失败的影像不计入分母：只要所有未失败的影像都已完成且至少有一张完成，批次即可生成报告。

use pacs_core::{ImageStatus, MedicalImage};
use serde::{Deserialize, Serialize};

/// 批次进度统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub total: usize,
    pub completed: usize,
    pub in_flight: usize,
    pub errored: usize,
}

impl BatchProgress {
    pub fn from_images(images: &[MedicalImage]) -> Self {
        images.iter().fold(Self::default(), |mut progress, image| {
            progress.total += 1;
            match image.status {
                ImageStatus::Completed => progress.completed += 1,
                ImageStatus::Error => progress.errored += 1,
                ImageStatus::Uploading | ImageStatus::Processing => progress.in_flight += 1,
            }
            progress
        })
    }

    /// 未失败的影像数量
    pub fn active(&self) -> usize {
        self.total - self.errored
    }

    pub fn is_ready(&self) -> bool {
        self.completed == self.active() && self.completed > 0
    }
}

/// 批次是否可以生成报告
pub fn is_ready(images: &[MedicalImage]) -> bool {
    BatchProgress::from_images(images).is_ready()
}

/// 已完成的影像，保持原有顺序
pub fn completed_images(images: &[MedicalImage]) -> Vec<&MedicalImage> {
    images
        .iter()
        .filter(|image| image.status == ImageStatus::Completed)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn image(status: ImageStatus) -> MedicalImage {
        MedicalImage::synthetic("CT").with_status(status)
    }

    #[test]
    fn test_empty_batch_is_not_ready() {
        assert!(!is_ready(&[]));
    }

    #[test]
    fn test_all_completed_is_ready() {
        let images = vec![image(ImageStatus::Completed), image(ImageStatus::Completed)];
        assert!(is_ready(&images));
    }

    #[test]
    fn test_errored_images_are_excluded() {
        let mut images = vec![image(ImageStatus::Completed)];
        images.extend((0..9).map(|_| image(ImageStatus::Error)));
        assert!(is_ready(&images));

        let progress = BatchProgress::from_images(&images);
        assert_eq!(progress.errored, 9);
        assert_eq!(progress.active(), 1);
    }

    #[test]
    fn test_only_errors_is_not_ready() {
        let images = vec![image(ImageStatus::Error), image(ImageStatus::Error)];
        assert!(!is_ready(&images));
    }

    #[test]
    fn test_in_flight_blocks_readiness() {
        let images = vec![image(ImageStatus::Completed), image(ImageStatus::Processing)];
        assert!(!is_ready(&images));

        let images = vec![image(ImageStatus::Uploading), image(ImageStatus::Completed)];
        assert!(!is_ready(&images));
    }

    #[test]
    fn test_completed_images_keeps_order() {
        let images = vec![
            image(ImageStatus::Completed),
            image(ImageStatus::Error),
            image(ImageStatus::Completed),
        ];

        let completed = completed_images(&images);
        assert_eq!(completed.len(), 2);
        assert_eq!(completed[0].id, images[0].id);
        assert_eq!(completed[1].id, images[2].id);
    }

    fn status_strategy() -> impl Strategy<Value = ImageStatus> {
        prop_oneof![
            Just(ImageStatus::Uploading),
            Just(ImageStatus::Processing),
            Just(ImageStatus::Completed),
            Just(ImageStatus::Error),
        ]
    }

    proptest! {
        #[test]
        fn prop_ready_iff_no_in_flight_and_some_completed(
            statuses in proptest::collection::vec(status_strategy(), 0..20)
        ) {
            let images: Vec<_> = statuses.iter().map(|s| image(*s)).collect();
            let in_flight = statuses
                .iter()
                .any(|s| matches!(s, ImageStatus::Uploading | ImageStatus::Processing));
            let any_completed = statuses.contains(&ImageStatus::Completed);

            prop_assert_eq!(is_ready(&images), !in_flight && any_completed);
            prop_assert_eq!(is_ready(&images), is_ready(&images));
        }
    }
}
