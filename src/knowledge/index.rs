//! Vector Index - 메모리 내 정확(flat) L2 k-NN 인덱스
//!
//! 행 번호가 곧 청크 위치입니다. 추가만 가능하고 줄어들지 않습니다.

use crate::error::{RagError, RagResult};

// ============================================================================
// Types
// ============================================================================

/// k-NN 검색 결과 한 건
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// 제곱 L2 거리 (작을수록 가까움)
    pub distance: f32,
    /// 인덱스 행 번호
    pub row: usize,
}

// ============================================================================
// VectorIndex Trait
// ============================================================================

/// 벡터 인덱스 트레이트
pub trait VectorIndex: Send + Sync {
    /// 벡터 추가 (모두 같은 차원이어야 함)
    fn add(&mut self, vectors: Vec<Vec<f32>>) -> RagResult<()>;

    /// 거리 오름차순 상위 k개
    fn search(&self, query: &[f32], k: usize) -> RagResult<Vec<Neighbor>>;

    /// 행 수
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 벡터 차원
    fn dimension(&self) -> usize;
}

// ============================================================================
// FlatL2Index
// ============================================================================

/// 전수 비교 L2 인덱스
///
/// 벡터를 한 줄로 이어 붙인 버퍼에 저장합니다.
#[derive(Debug, Clone)]
pub struct FlatL2Index {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    /// 차원을 지정하여 빈 인덱스 생성
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// 차원 검사 (추가 전 일괄 확인용)
    pub fn check_dimension(&self, width: usize) -> RagResult<()> {
        if width != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: width,
            });
        }
        Ok(())
    }

    fn row(&self, row: usize) -> &[f32] {
        let start = row * self.dimension;
        &self.data[start..start + self.dimension]
    }
}

impl VectorIndex for FlatL2Index {
    fn add(&mut self, vectors: Vec<Vec<f32>>) -> RagResult<()> {
        // 하나라도 어긋나면 아무것도 추가하지 않음
        for v in &vectors {
            self.check_dimension(v.len())?;
        }

        self.data.reserve(vectors.len() * self.dimension);
        for v in vectors {
            self.data.extend(v);
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> RagResult<Vec<Neighbor>> {
        self.check_dimension(query.len())?;

        let k = k.min(self.len());
        if k == 0 {
            return Ok(vec![]);
        }

        let mut scored: Vec<Neighbor> = (0..self.len())
            .map(|row| Neighbor {
                distance: squared_l2(self.row(row), query),
                row,
            })
            .collect();

        // 거리 같으면 먼저 들어온 행 우선
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.row.cmp(&b.row)));
        scored.truncate(k);

        Ok(scored)
    }

    fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// 제곱 L2 거리
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> FlatL2Index {
        let mut index = FlatL2Index::new(2);
        index
            .add(vec![vec![0.0, 0.0], vec![10.0, 0.0], vec![1.0, 1.0]])
            .unwrap();
        index
    }

    #[test]
    fn test_search_orders_by_distance() {
        let index = sample_index();
        let hits = index.search(&[0.9, 0.9], 3).unwrap();

        let rows: Vec<usize> = hits.iter().map(|n| n.row).collect();
        assert_eq!(rows, vec![2, 0, 1]);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_k_clamped_to_rows() {
        let index = sample_index();
        let hits = index.search(&[0.0, 0.0], 30).unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_empty_index_search() {
        let index = FlatL2Index::new(4);
        assert!(index.is_empty());
        assert!(index.search(&[0.0; 4], 5).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_mismatch_adds_nothing() {
        let mut index = sample_index();
        let result = index.add(vec![vec![1.0, 2.0], vec![1.0, 2.0, 3.0]]);

        assert!(matches!(
            result,
            Err(RagError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_query_dimension_checked() {
        let index = sample_index();
        assert!(index.search(&[1.0], 1).is_err());
    }

    #[test]
    fn test_nan_distances_sort_consistently() {
        let mut index = FlatL2Index::new(2);
        index
            .add(vec![vec![f32::NAN, 0.0], vec![5.0, 5.0], vec![f32::NAN, 1.0], vec![1.0, 1.0]])
            .unwrap();

        let hits = index.search(&[0.0, 0.0], 4).unwrap();
        let finite: Vec<usize> = hits
            .iter()
            .filter(|n| !n.distance.is_nan())
            .map(|n| n.row)
            .collect();
        let nan: Vec<usize> = hits
            .iter()
            .filter(|n| n.distance.is_nan())
            .map(|n| n.row)
            .collect();

        assert_eq!(finite, vec![3, 1]);
        assert_eq!(nan, vec![0, 2]);
        let again: Vec<usize> = index
            .search(&[0.0, 0.0], 4)
            .unwrap()
            .iter()
            .map(|n| n.row)
            .collect();
        assert_eq!(again, hits.iter().map(|n| n.row).collect::<Vec<_>>());
    }

    #[test]
    fn test_equal_distances_keep_row_order() {
        let mut index = FlatL2Index::new(1);
        index.add(vec![vec![1.0], vec![-1.0], vec![1.0]]).unwrap();

        let rows: Vec<usize> = index.search(&[0.0], 3).unwrap().iter().map(|n| n.row).collect();
        assert_eq!(rows, vec![0, 1, 2]);
    }

    #[test]
    fn test_squared_l2() {
        assert_eq!(squared_l2(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
        assert_eq!(squared_l2(&[], &[]), 0.0);
    }
}
