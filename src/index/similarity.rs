//! 余弦相似度计算
//!
//! 所有检索策略共用的基础原语。纯函数，无副作用。

/// 计算两个等长向量的余弦相似度，取值范围 [-1, 1]。
///
/// 零模长向量的余弦相似度在数学上未定义，这里返回 0.0；
/// 调用方仍应通过 `usable_embedding` 守卫过滤全零向量。
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len());

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
