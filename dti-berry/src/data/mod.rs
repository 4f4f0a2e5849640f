use std::fs;
use std::ops::{Index, IndexMut};
use std::path::{Path, PathBuf};

use ndarray::{Array3, ArrayD, ArrayView, ArrayViewMut, Ix3};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::consts::label::*;
use crate::consts::{ORIGIN_TOLERANCE_MM, SPACING_TOLERANCE_MM};
use crate::{Idx3d, SegError, SegResult};

pub mod neighbour;

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// 将 (W, H, z) 转换成 (z, H, W). 以后均按照该模式访问.
#[inline]
pub(crate) fn get_shape_from_header(h: &NiftiHeader) -> Idx3d {
    // [W, H, z]. 体素个数数组.
    let [_, w, h, z, ..] = h.dim;
    (z as usize, h as usize, w as usize)
}

/// 为手动拼接的数据构造最小可用 header. `spacing` 按 `(z, H, W)` 给出.
fn header_for((z, h, w): Idx3d, spacing: [f32; 3]) -> BoxedHeader {
    let mut header = Box::<NiftiHeader>::default();
    header.dim = [3, w as u16, h as u16, z as u16, 1, 1, 1, 1];
    let [sz, sh, sw] = spacing;
    header.pixdim = [1.0, sw, sh, sz, 1.0, 1.0, 1.0, 1.0];
    header.scl_slope = 1.0;
    header.scl_inter = 0.0;
    header
}

/// nifti 数据在文件中按 Fortran 序存储. 反转全部轴后再取行优先裸数据,
/// 即得到按 (z, H, W) 排列的体素序列.
pub(crate) fn into_zhw<T: Clone>(data: ArrayD<T>, shape: Idx3d) -> SegResult<Array3<T>> {
    let len = data.len();
    let rev: Vec<usize> = (0..data.ndim()).rev().collect();
    let data = data.permuted_axes(rev.as_slice());
    let raw = data.as_standard_layout().into_owned().into_raw_vec();
    Array3::from_shape_vec(shape, raw).map_err(|_| SegError::NotAVolume(len, shape))
}

/// 读取 3D nii 文件, 返回 header 与按 (z, H, W) 组织的数据.
macro_rules! read_3d {
    ($path: expr, $t: ty) => {{
        let obj = ReaderOptions::new().read_file($path)?;
        let header = Box::new(obj.header().clone());
        let data = obj.into_volume().into_ndarray::<$t>()?;
        let data = into_zhw(data, get_shape_from_header(&header))?;
        (header, data)
    }};
}

/// 获取与 `path` 同目录的隐藏临时文件路径. 保留原文件名后缀,
/// 以便 nifti writer 仍能根据 `.gz` 后缀决定是否压缩.
fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".partial-{}-{name}", std::process::id()))
}

/// 3D nii 文件 header 的共用属性和部分通用操作.
pub trait NiftiHeaderAttr {
    /// 获取 header 部分.
    fn header(&self) -> &NiftiHeader;

    /// 获取数据形状大小.
    #[inline]
    fn shape(&self) -> Idx3d {
        get_shape_from_header(self.header())
    }

    /// 获取数据体素个数.
    #[inline]
    fn size(&self) -> usize {
        let (z, h, w) = self.shape();
        z * h * w
    }

    /// 检查索引是否合法.
    #[inline]
    fn check(&self, (z0, h0, w0): &Idx3d) -> bool {
        let (z, h, w) = self.shape();
        *z0 < z && *h0 < h && *w0 < w
    }

    /// 获取单个体素分辨率. 该分辨率以毫米为单位, 分别代表空间 (相邻切片方向),
    /// 高 (自然图像的垂直方向), 宽 (自然图像的水平方向).
    #[inline]
    fn pix_dim(&self) -> [f64; 3] {
        let [_, w, h, z, ..] = self.header().pixdim;
        [z as f64, h as f64, w as f64]
    }

    /// 获取体素的实际体积值, 以立方毫米为单位.
    #[inline]
    fn voxel(&self) -> f64 {
        self.pix_dim().iter().product()
    }

    /// 获取图像原点 (第一个体素中心的世界坐标), 以毫米为单位, 按 `[x, y, z]` 给出.
    ///
    /// 优先使用 qform, 其次 sform. 两者都未设置时返回零向量.
    fn origin(&self) -> [f64; 3] {
        let h = self.header();
        if h.qform_code > 0 {
            [h.quatern_x as f64, h.quatern_y as f64, h.quatern_z as f64]
        } else if h.sform_code > 0 {
            [h.srow_x[3] as f64, h.srow_y[3] as f64, h.srow_z[3] as f64]
        } else {
            [0.0; 3]
        }
    }

    /// 检查 `self` 与 `other` 是否位于同一体素空间 (形状, 分辨率, 原点一致).
    ///
    /// 该 crate 不做重采样, 所以任何参与同一次计算的两个体素数据都必须先通过该检查.
    fn check_aligned<O: NiftiHeaderAttr + ?Sized>(&self, other: &O) -> SegResult<()> {
        if self.shape() != other.shape() {
            return Err(SegError::Misaligned {
                what: format!("shape {:?} vs {:?}", self.shape(), other.shape()),
            });
        }
        let close = |a: [f64; 3], b: [f64; 3], tol: f64| {
            a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() <= tol)
        };
        if !close(self.pix_dim(), other.pix_dim(), SPACING_TOLERANCE_MM) {
            return Err(SegError::Misaligned {
                what: format!("spacing {:?} vs {:?}", self.pix_dim(), other.pix_dim()),
            });
        }
        if !close(self.origin(), other.origin(), ORIGIN_TOLERANCE_MM) {
            return Err(SegError::Misaligned {
                what: format!("origin {:?} vs {:?}", self.origin(), other.origin()),
            });
        }
        Ok(())
    }
}

/// nii 格式 3D DTI 标量图 (FA, MD, ...), 包括 header 和体素值. 体素值以 `f32` 保存.
#[derive(Debug, Clone)]
pub struct DtiMap {
    header: BoxedHeader,
    data: Array3<f32>,
}

impl NiftiHeaderAttr for DtiMap {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl Index<Idx3d> for DtiMap {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl DtiMap {
    /// 打开 nii 文件格式的 3D 标量图. `path` 为 nii 文件的本地路径.
    /// 整数类型的体素值会被转换为 `f32` (并应用 header 中的缩放参数).
    pub fn open<P: AsRef<Path>>(path: P) -> SegResult<Self> {
        let (header, data) = read_3d!(path.as_ref(), f32);
        Ok(Self { header, data })
    }

    /// 根据裸数据直接创建 `DtiMap`.
    ///
    /// `data` 按 `(z, H, W)` 组织, `spacing` 同样按 `(z, H, W)` 给出, 以毫米为单位.
    ///
    /// # 注意
    ///
    /// 生成的 header 仅包含形状与分辨率, 原点为零. 你应仅将其用于实验和测试.
    pub fn fake(data: Array3<f32>, spacing: [f32; 3]) -> Self {
        let header = header_for(data.dim(), spacing);
        Self { header, data }
    }

    /// 用 `header` 的元信息包装 `data`. `data` 按 `(z, H, W)` 组织, 形状必须与 `header` 一致.
    pub fn with_header(header: &NiftiHeader, data: Array3<f32>) -> SegResult<Self> {
        let shape = get_shape_from_header(header);
        if shape != data.dim() {
            return Err(SegError::Misaligned {
                what: format!("header shape {:?} vs data shape {:?}", shape, data.dim()),
            });
        }
        Ok(Self {
            header: Box::new(header.clone()),
            data,
        })
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, f32, Ix3> {
        self.data.view()
    }

    /// 消费自我, 获得底层数据.
    #[inline]
    pub fn into_data(self) -> Array3<f32> {
        self.data
    }
}

/// nii 格式 3D 标签, 包括 header 和标签值. 标签值以 `u8` 保存.
///
/// 病灶标签使用 `{0, 1, 2}` 编码 (见 [`crate::consts::label`]),
/// 聚类/MRF 标签使用 `{0..K-1}` 编码.
#[derive(Debug, Clone)]
pub struct LabelVolume {
    header: BoxedHeader,
    data: Array3<u8>,
}

impl NiftiHeaderAttr for LabelVolume {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl Index<Idx3d> for LabelVolume {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl IndexMut<Idx3d> for LabelVolume {
    #[inline]
    fn index_mut(&mut self, index: Idx3d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

impl LabelVolume {
    /// 打开 nii 文件格式的 3D 标签. 非整数体素值按 `as` 语义截断为 `u8`.
    pub fn open<P: AsRef<Path>>(path: P) -> SegResult<Self> {
        let (header, data) = read_3d!(path.as_ref(), u8);
        Ok(Self { header, data })
    }

    /// 创建与 `like` 位于同一体素空间的全背景标签.
    pub fn background_like<L: NiftiHeaderAttr + ?Sized>(like: &L) -> Self {
        let mut header = Box::new(like.header().clone());
        header.scl_slope = 1.0;
        header.scl_inter = 0.0;
        Self {
            header,
            data: Array3::from_elem(like.shape(), LESION_BACKGROUND),
        }
    }

    /// 用 `like` 的元信息包装 `data`. `data` 按 `(z, H, W)` 组织, 形状必须与 `like` 一致.
    pub fn with_header_of<L: NiftiHeaderAttr + ?Sized>(
        like: &L,
        data: Array3<u8>,
    ) -> SegResult<Self> {
        if like.shape() != data.dim() {
            return Err(SegError::Misaligned {
                what: format!("header shape {:?} vs data shape {:?}", like.shape(), data.dim()),
            });
        }
        let mut label = Self::background_like(like);
        label.data = data;
        Ok(label)
    }

    /// 根据裸标签数据直接创建 `LabelVolume`.
    ///
    /// `data` 按 `(z, H, W)` 组织, `spacing` 同样按 `(z, H, W)` 给出.
    ///
    /// # 注意
    ///
    /// 该方法可能会创建与其它数据不一致的实体, 因此你应仅将其用于实验目的.
    pub fn fake(data: Array3<u8>, spacing: [f32; 3]) -> Self {
        let header = header_for(data.dim(), spacing);
        Self { header, data }
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, u8, Ix3> {
        self.data.view()
    }

    /// 获得数据的一份可变 shallow copy.
    #[inline]
    pub fn data_mut(&mut self) -> ArrayViewMut<'_, u8, Ix3> {
        self.data.view_mut()
    }

    /// 消费自我, 获得底层数据.
    #[inline]
    pub fn into_data(self) -> Array3<u8> {
        self.data
    }

    /// 获取标签中值为 `label` 的体素个数.
    #[inline]
    pub fn count(&self, label: u8) -> usize {
        self.data.iter().filter(|p| **p == label).count()
    }

    /// 获取非背景体素个数.
    #[inline]
    pub fn foreground_count(&self) -> usize {
        self.data.iter().filter(|p| !is_background(**p)).count()
    }

    /// 获取病灶标签的基本统计信息.
    ///
    /// 统计信息格式为: \[背景体素数, 新发现体素数, 继承体素数\].
    /// 该操作不会统计任何其他标签值.
    pub fn numeric_statistics(&self) -> [usize; 3] {
        let mut ans = [0; 3];
        for pixel in self.data.iter().filter(|p| **p <= LESION_PRIOR) {
            ans[*pixel as usize] += 1;
        }
        ans
    }

    /// 将标签写入 nii 文件 (`.nii` 或 `.nii.gz`, 由后缀决定).
    ///
    /// 数据先写入同目录的隐藏临时文件, 成功后再重命名为 `path`.
    /// 失败时临时文件会被删除, 因此不会留下不完整的输出.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> SegResult<()> {
        let path = path.as_ref();
        let partial = partial_path(path);

        let mut header = self.header.as_ref().clone();
        header.scl_slope = 1.0;
        header.scl_inter = 0.0;

        // (z, H, W) -> [W, H, z]
        let view = self.data.view().permuted_axes([2, 1, 0]);
        let written = WriterOptions::new(&partial)
            .reference_header(&header)
            .write_nifti(&view);

        let committed = match written {
            Ok(()) => fs::rename(&partial, path).map_err(SegError::from),
            Err(e) => Err(SegError::from(e)),
        };
        if committed.is_err() {
            let _ = fs::remove_file(&partial);
        }
        committed
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use ndarray::Axis;
        use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
    }
}

/// 对 `data` 的每个体素实施 `op` 操作, 同时携带体素索引.
///
/// 开启 `rayon` feature 时按水平切片并行执行. `op` 只能读取不可变快照,
/// 不应依赖体素的访问顺序.
pub(crate) fn for_each_voxel_mut<T, F>(data: &mut Array3<T>, op: F)
where
    T: Send + Sync,
    F: Fn(Idx3d, &mut T) + Sync + Send,
{
    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            data.axis_iter_mut(Axis(0))
                .into_par_iter()
                .enumerate()
                .for_each(|(z, mut sli)| {
                    for ((h, w), v) in sli.indexed_iter_mut() {
                        op((z, h, w), v);
                    }
                });
        } else {
            data.indexed_iter_mut().for_each(|(pos, v)| op(pos, v));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{for_each_voxel_mut, DtiMap, LabelVolume, NiftiHeaderAttr};
    use crate::consts::label::*;
    use ndarray::Array3;

    #[test]
    fn test_fake_header_shape() {
        let map = DtiMap::fake(Array3::zeros((2, 3, 4)), [2.0, 1.0, 1.0]);
        assert_eq!(map.shape(), (2, 3, 4));
        assert_eq!(map.size(), 24);
        assert_eq!(map.pix_dim(), [2.0, 1.0, 1.0]);
        assert_eq!(map.voxel(), 2.0);
        assert!(map.check(&(1, 2, 3)));
        assert!(!map.check(&(2, 0, 0)));
    }

    #[test]
    fn test_alignment() {
        let a = DtiMap::fake(Array3::zeros((2, 3, 4)), [1.0; 3]);
        let b = LabelVolume::fake(Array3::zeros((2, 3, 4)), [1.0; 3]);
        let c = LabelVolume::fake(Array3::zeros((2, 4, 3)), [1.0; 3]);
        let d = DtiMap::fake(Array3::zeros((2, 3, 4)), [2.0, 1.0, 1.0]);
        assert!(a.check_aligned(&b).is_ok());
        assert!(a.check_aligned(&c).is_err());
        assert!(a.check_aligned(&d).is_err());
    }

    #[test]
    fn test_label_statistics() {
        let mut label = LabelVolume::background_like(&DtiMap::fake(
            Array3::zeros((3, 3, 3)),
            [1.0; 3],
        ));
        label[(0, 0, 0)] = LESION_CANDIDATE;
        label[(1, 1, 1)] = LESION_PRIOR;
        label[(2, 2, 2)] = LESION_PRIOR;
        label[(2, 2, 1)] = 7;
        assert_eq!(label.numeric_statistics(), [23, 1, 2]);
        assert_eq!(label.foreground_count(), 4);
        assert_eq!(label.count(7), 1);
    }

    #[test]
    fn test_label_save_round_trip() {
        let data = Array3::from_shape_fn((3, 4, 5), |(z, h, w)| ((z + h * w) % 3) as u8);
        let label = LabelVolume::fake(data.clone(), [1.0; 3]);

        let path = std::env::temp_dir().join(format!("dti-berry-{}-label.nii", std::process::id()));
        label.save(&path).unwrap();
        let back = LabelVolume::open(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(back.shape(), (3, 4, 5));
        assert_eq!(back.data(), data.view());
    }

    #[test]
    fn test_label_save_failure_leaves_nothing() {
        let root =
            std::env::temp_dir().join(format!("dti-berry-{}-save-fail", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        // 目标路径是非空目录, 重命名必然失败.
        let target = root.join("out.nii");
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(target.join("keep"), b"x").unwrap();

        let label = LabelVolume::fake(Array3::zeros((2, 2, 2)), [1.0; 3]);
        assert!(label.save(&target).is_err());

        let names: Vec<String> = std::fs::read_dir(&root)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        std::fs::remove_dir_all(&root).unwrap();
        assert_eq!(names, vec!["out.nii".to_string()]);
    }

    #[test]
    fn test_for_each_voxel_mut_visits_every_index() {
        let shape = (3, 4, 5);
        let mut data = Array3::<u32>::zeros(shape);
        let code = |(z, h, w): (usize, usize, usize)| (z * 100 + h * 10 + w) as u32 + 1;
        for_each_voxel_mut(&mut data, |pos, v| *v += code(pos));
        assert_eq!(data, Array3::from_shape_fn(shape, code));
    }
}
