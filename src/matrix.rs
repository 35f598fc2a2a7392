
use std::mem::{size_of};
use crate::quantify::Quantifiable;

///A simple row-major matrix. Used for the dense request storage of the allocators and the priority matrix of the matrix arbiter.
#[derive(Clone,Debug)]
pub struct Matrix<T>
{
	data: Vec<T>,
	num_columns: usize,
}

impl<T> Matrix<T>
{
	///Read a matrix entry.
	pub fn get(&self,row:usize,column:usize) -> &T
	{
		&self.data[row*self.num_columns+column]
	}
	///Read/write a matrix entry.
	pub fn get_mut(&mut self,row:usize,column:usize) -> &mut T
	{
		&mut self.data[row*self.num_columns+column]
	}
	///Get the number of rows
	pub fn get_rows(&self) -> usize
	{
		if self.num_columns==0 { 0 } else { self.data.len()/self.num_columns }
	}
	///Get the number of columns
	pub fn get_columns(&self) -> usize
	{
		self.num_columns
	}
	///The entries of a row, in column order.
	pub fn row(&self,row:usize) -> &[T]
	{
		&self.data[row*self.num_columns..(row+1)*self.num_columns]
	}
	///Build a matrix with constant values.
	pub fn constant(value:T,num_rows:usize,num_columns:usize) -> Matrix<T> where T:Clone
	{
		Matrix{
			data: vec![value;num_rows*num_columns],
			num_columns,
		}
	}
	///Set every entry to `value`.
	pub fn fill(&mut self,value:T) where T:Clone
	{
		for entry in self.data.iter_mut()
		{
			*entry=value.clone();
		}
	}
	pub fn map<U,F:FnMut(&T)->U>(&self, f:F) -> Matrix<U>
	{
		Matrix{
			data: self.data.iter().map(f).collect(),
			num_columns: self.num_columns,
		}
	}
}

impl<T:Quantifiable> Quantifiable for Matrix<T>
{
	fn total_memory(&self) -> usize
	{
		return size_of::<Matrix<T>>() + self.data.total_memory();
	}
	fn print_memory_breakdown(&self)
	{
		unimplemented!();
	}
	fn forecast_total_memory(&self) -> usize
	{
		unimplemented!();
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	#[test]
	fn rows_and_columns()
	{
		let mut m=Matrix::constant(0usize,3,2);
		*m.get_mut(2,1)=7;
		assert_eq!(m.get_rows(),3);
		assert_eq!(m.get_columns(),2);
		assert_eq!(m.row(2),&[0,7]);
		let doubled=m.map(|x|x*2);
		assert_eq!(*doubled.get(2,1),14);
		m.fill(1);
		assert_eq!(*m.get(0,0),1);
	}
}

