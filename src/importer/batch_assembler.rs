// ==========================================
// 城市地理数据导入 - 批次组装器
// ==========================================
// 职责: 将合格记录按源顺序分组为不超过 batch_size 的批次
// 红线: 永不产出空批次
// ==========================================

use crate::domain::ClassifiedCity;

pub struct BatchAssembler {
    batch_size: usize,
    pending: Vec<ClassifiedCity>,
}

impl BatchAssembler {
    /// batch_size 为 0 时按 1 处理（参数校验在 RunParams::validate 中完成）
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            batch_size,
            pending: Vec::with_capacity(batch_size),
        }
    }

    /// 追加一条记录; 攒满一批时返回该批次
    pub fn push(&mut self, city: ClassifiedCity) -> Option<Vec<ClassifiedCity>> {
        self.pending.push(city);
        if self.pending.len() >= self.batch_size {
            Some(std::mem::replace(
                &mut self.pending,
                Vec::with_capacity(self.batch_size),
            ))
        } else {
            None
        }
    }

    /// 取出剩余记录（可能不足一批）; 无剩余时返回 None
    pub fn finish(&mut self) -> Option<Vec<ClassifiedCity>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// 一次性组装整个序列
    pub fn assemble<I>(batch_size: usize, cities: I) -> Vec<Vec<ClassifiedCity>>
    where
        I: IntoIterator<Item = ClassifiedCity>,
    {
        let mut assembler = Self::new(batch_size);
        let mut batches: Vec<Vec<ClassifiedCity>> = cities
            .into_iter()
            .filter_map(|city| assembler.push(city))
            .collect();
        batches.extend(assembler.finish());
        batches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NormalizedCity, Region};

    fn city(name: &str) -> ClassifiedCity {
        ClassifiedCity {
            city: NormalizedCity::new(name, "France"),
            region: Region::Europe,
        }
    }

    #[test]
    fn test_assemble_preserves_order_and_bounds() {
        let names = ["a", "b", "c", "d", "e"];
        let batches = BatchAssembler::assemble(2, names.iter().map(|n| city(n)));

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[2].len(), 1);

        let flattened: Vec<&str> = batches
            .iter()
            .flatten()
            .map(|c| c.city.name.as_str())
            .collect();
        assert_eq!(flattened, names);
    }

    #[test]
    fn test_no_empty_batches() {
        let batches = BatchAssembler::assemble(3, Vec::new());
        assert!(batches.is_empty());

        let mut assembler = BatchAssembler::new(2);
        assert!(assembler.push(city("x")).is_none());
        assert_eq!(assembler.push(city("y")).map(|b| b.len()), Some(2));
        assert!(assembler.finish().is_none());
    }

    #[test]
    fn test_exact_multiple() {
        let batches = BatchAssembler::assemble(2, (0..4).map(|i| city(&i.to_string())));
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.len() == 2));
    }
}
