//! 크기 제한 LRU 맵
//!
//! 웹 서버의 세션과 업로드 파일을 보관합니다. 용량을 넘으면 가장 오래
//! 사용되지 않은 항목부터 버립니다.

use std::collections::HashMap;

/// 문자열 키 LRU 맵
#[derive(Debug)]
pub struct LruMap<V> {
    entries: HashMap<String, V>,
    /// 앞쪽이 가장 오래 사용되지 않은 키
    access_order: Vec<String>,
    max_size: usize,
}

impl<V> LruMap<V> {
    /// 최대 항목 수로 생성 (0은 1로 보정)
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: HashMap::new(),
            access_order: Vec::new(),
            max_size: max_size.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// 조회 (사용 순서 갱신 없음)
    pub fn peek(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    /// 조회 후 최근 사용으로 표시
    pub fn get(&mut self, key: &str) -> Option<&V> {
        if !self.entries.contains_key(key) {
            return None;
        }
        self.mark_accessed(key);
        self.entries.get(key)
    }

    /// 가변 조회 후 최근 사용으로 표시
    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        if !self.entries.contains_key(key) {
            return None;
        }
        self.mark_accessed(key);
        self.entries.get_mut(key)
    }

    /// 삽입 (용량 초과 시 밀려난 항목 반환)
    pub fn insert(&mut self, key: String, value: V) -> Option<(String, V)> {
        if self.entries.insert(key.clone(), value).is_some() {
            self.mark_accessed(&key);
            return None;
        }
        self.access_order.push(key);

        if self.entries.len() <= self.max_size {
            return None;
        }

        let evict_key = self.access_order.remove(0);
        self.entries
            .remove(&evict_key)
            .map(|evicted| (evict_key, evicted))
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        let value = self.entries.remove(key)?;
        if let Some(idx) = self.access_order.iter().position(|k| k == key) {
            self.access_order.remove(idx);
        }
        Some(value)
    }

    /// 최근 사용 순서의 맨 뒤로 이동
    fn mark_accessed(&mut self, key: &str) {
        if let Some(idx) = self.access_order.iter().position(|k| k == key) {
            let k = self.access_order.remove(idx);
            self.access_order.push(k);
        }
    }
}
